use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{Graveyard, Program, ProgramId, ProgramSources, ProgramStage, ShaderSynthesizer};
use crate::errors::{RenderError, Result};
use crate::gpu::{GpuDevice, GpuProgram};
use crate::state::StateSlots;

/// Hash → program map with shared-ownership eviction.
///
/// `get` hands out `Rc<Program>`; the use count of a program is its strong
/// count. When the last `Rc` drops, the program's device handles move to the
/// graveyard until the next [`collect_garbage`](Self::collect_garbage).
pub struct ProgramCache {
    programs: FxHashMap<String, Weak<Program>>,
    graveyard: Graveyard,
    synthesizer: Box<dyn ShaderSynthesizer>,
    next_id: u32,
}

impl ProgramCache {
    #[must_use]
    pub fn new(synthesizer: Box<dyn ShaderSynthesizer>) -> Self {
        Self {
            programs: FxHashMap::default(),
            graveyard: Rc::new(RefCell::new(Vec::new())),
            synthesizer,
            next_id: 1,
        }
    }

    /// Returns the program for `hash`, compiling it on first request.
    ///
    /// `slots` is only read when the program has to be synthesized.
    pub fn get(
        &mut self,
        device: &mut dyn GpuDevice,
        hash: &str,
        slots: &StateSlots,
    ) -> Result<Rc<Program>> {
        if let Some(program) = self.programs.get(hash).and_then(Weak::upgrade) {
            return Ok(program);
        }

        let sources = self.synthesizer.synthesize(hash, slots)?;
        let handles = compile_all(device, hash, &sources)?;

        let id = ProgramId(self.next_id);
        self.next_id += 1;
        log::debug!("Compiled program {} for '{hash}'", id.0);

        let program = Rc::new(Program::new(
            id,
            hash.to_owned(),
            sources,
            handles,
            Rc::clone(&self.graveyard),
        ));
        self.programs.insert(hash.to_owned(), Rc::downgrade(&program));
        Ok(program)
    }

    /// Number of render objects (and other holders) sharing the program.
    #[must_use]
    pub fn use_count(&self, hash: &str) -> usize {
        self.programs.get(hash).map_or(0, Weak::strong_count)
    }

    #[must_use]
    pub fn contains(&self, hash: &str) -> bool {
        self.use_count(hash) > 0
    }

    /// Number of live programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.values().filter(|p| p.strong_count() > 0).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deletes the device programs of evicted entries.
    pub fn collect_garbage(&mut self, device: &mut dyn GpuDevice) {
        let dead: Vec<GpuProgram> = std::mem::take(&mut *self.graveyard.borrow_mut());
        for handle in dead {
            device.delete_program(handle);
        }
        self.programs.retain(|_, p| p.strong_count() > 0);
    }

    /// Recompiles every live program after the device lost its context.
    ///
    /// Handles parked in the graveyard belong to the lost context and are
    /// dropped without deletion.
    pub fn context_restored(&mut self, device: &mut dyn GpuDevice) {
        self.graveyard.borrow_mut().clear();
        self.programs.retain(|_, p| p.strong_count() > 0);

        for (hash, program) in &self.programs {
            let Some(program) = program.upgrade() else {
                continue;
            };
            match compile_all(device, hash, program.sources()) {
                Ok(handles) => program.replace_handles(handles),
                Err(err) => log::error!("Failed to restore program '{hash}': {err}"),
            }
        }
        log::info!("Restored {} programs", self.programs.len());
    }
}

impl std::fmt::Debug for ProgramCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCache")
            .field("programs", &self.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

/// Compiles every variant; on failure deletes the ones that did compile.
fn compile_all(
    device: &mut dyn GpuDevice,
    hash: &str,
    sources: &ProgramSources,
) -> Result<[GpuProgram; ProgramStage::COUNT]> {
    let mut compiled: SmallVec<[GpuProgram; ProgramStage::COUNT]> = SmallVec::new();
    for stage in ProgramStage::ALL {
        let source = sources.stage(stage);
        let label = format!("{stage}:{hash}");
        match device.compile_program(&label, &source.vertex, &source.fragment) {
            Ok(handle) => compiled.push(handle),
            Err(log) => {
                log::error!("Failed to build {stage} program for '{hash}':\n{log}");
                for handle in compiled {
                    device.delete_program(handle);
                }
                return Err(RenderError::ProgramBuild {
                    hash: hash.to_owned(),
                    stage,
                    log,
                });
            }
        }
    }
    Ok([compiled[0], compiled[1], compiled[2], compiled[3], compiled[4]])
}
