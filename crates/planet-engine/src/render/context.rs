use super::backend::{Backend, ProgramId};

/// Backend plus the process-wide "active program" cell.
///
/// Every `ShaderProgram` call goes through one `RenderContext`, so program
/// activation can be elided when the requested program is already current.
pub struct RenderContext<B: Backend> {
    backend: B,
    active_program: Option<ProgramId>,
    activations: u64,
}

impl<B: Backend> RenderContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active_program: None,
            activations: 0,
        }
    }

    /// Activates `program` unless it is already active.
    ///
    /// Returns `true` when an activation was issued to the backend.
    pub fn use_program(&mut self, program: ProgramId) -> bool {
        if self.active_program == Some(program) {
            return false;
        }
        self.backend.use_program(program);
        self.active_program = Some(program);
        self.activations += 1;
        true
    }

    /// Program that uniform uploads and draws currently target.
    pub fn active_program(&self) -> Option<ProgramId> {
        self.active_program
    }

    /// Number of activations actually issued to the backend.
    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn set_depth_test(&mut self, enabled: bool) {
        self.backend.set_depth_test(enabled);
    }

    pub fn set_blend(&mut self, enabled: bool) {
        self.backend.set_blend(enabled);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
