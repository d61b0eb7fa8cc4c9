//! Headless backend that records every call.
//!
//! Useful for exercising pass sequencing and state caching without a GPU.
//! Uniform uploads are also applied to a per-program byte image so tests can
//! read back what a shader would see.

use std::collections::HashMap;

use super::backend::{Backend, BufferId, BufferKind, ProgramDesc, ProgramId, TextureId, Topology};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateProgram(ProgramId),
    UseProgram(ProgramId),
    UploadUniform { program: ProgramId, offset: u32, bytes: Vec<u8> },
    CreateBuffer(BufferId, BufferKind),
    EnableAttribute { location: u32, buffer: BufferId },
    DisableAttribute(u32),
    BindIndexBuffer(BufferId),
    DrawElements { program: ProgramId, topology: Topology, count: u32 },
    CreateTexture(TextureId),
    BindTexture { unit: u32, texture: TextureId },
    SetClearColor([f32; 4]),
    Clear,
    SetViewport(u32, u32),
    SetDepthTest(bool),
    SetBlend(bool),
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    uniforms: HashMap<ProgramId, Vec<u8>>,
    active: Option<ProgramId>,
    next_program: u32,
    next_buffer: u32,
    next_texture: u32,
    fail_link: Option<String>,
}

impl RecordingBackend {
    /// Makes the next `create_program` fail with `log`.
    pub fn fail_next_link(&mut self, log: impl Into<String>) {
        self.fail_link = Some(log.into());
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(*c)).count()
    }

    /// Uniform block image of `program` as last written.
    pub fn uniform_bytes(&self, program: ProgramId) -> &[u8] {
        self.uniforms.get(&program).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reads an `f32` at `offset` from `program`'s uniform image.
    pub fn uniform_f32(&self, program: ProgramId, offset: u32) -> Option<f32> {
        let bytes = self.uniform_bytes(program);
        let start = offset as usize;
        let raw: [u8; 4] = bytes.get(start..start + 4)?.try_into().ok()?;
        Some(f32::from_ne_bytes(raw))
    }

    /// Reads an `i32` at `offset` from `program`'s uniform image.
    pub fn uniform_i32(&self, program: ProgramId, offset: u32) -> Option<i32> {
        let bytes = self.uniform_bytes(program);
        let start = offset as usize;
        let raw: [u8; 4] = bytes.get(start..start + 4)?.try_into().ok()?;
        Some(i32::from_ne_bytes(raw))
    }

    /// Draw calls in issue order as `(program, topology, count)`.
    pub fn draws(&self) -> Vec<(ProgramId, Topology, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::DrawElements { program, topology, count } => Some((*program, *topology, *count)),
                _ => None,
            })
            .collect()
    }
}

impl Backend for RecordingBackend {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, String> {
        if let Some(log) = self.fail_link.take() {
            return Err(log);
        }
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.uniforms.insert(id, vec![0; desc.uniform_size as usize]);
        self.calls.push(Call::CreateProgram(id));
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.active = Some(program);
        self.calls.push(Call::UseProgram(program));
    }

    fn upload_uniform(&mut self, offset: u32, bytes: &[u8]) {
        let Some(program) = self.active else {
            return;
        };
        if let Some(block) = self.uniforms.get_mut(&program) {
            let start = offset as usize;
            if let Some(dst) = block.get_mut(start..start + bytes.len()) {
                dst.copy_from_slice(bytes);
            }
        }
        self.calls.push(Call::UploadUniform {
            program,
            offset,
            bytes: bytes.to_vec(),
        });
    }

    fn create_buffer(&mut self, kind: BufferKind, _label: &str, _bytes: &[u8]) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.calls.push(Call::CreateBuffer(id, kind));
        id
    }

    fn enable_attribute(&mut self, location: u32, buffer: BufferId) {
        self.calls.push(Call::EnableAttribute { location, buffer });
    }

    fn disable_attribute(&mut self, location: u32) {
        self.calls.push(Call::DisableAttribute(location));
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.calls.push(Call::BindIndexBuffer(buffer));
    }

    fn draw_elements(&mut self, topology: Topology, count: u32) {
        let program = self.active.unwrap_or(ProgramId(u32::MAX));
        self.calls.push(Call::DrawElements { program, topology, count });
    }

    fn create_texture(&mut self, _label: &str, _width: u32, _height: u32, _rgba: &[u8]) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.calls.push(Call::CreateTexture(id));
        id
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.calls.push(Call::BindTexture { unit, texture });
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.calls.push(Call::SetClearColor(color));
    }

    fn clear(&mut self) {
        self.calls.push(Call::Clear);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::SetViewport(width, height));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(Call::SetDepthTest(enabled));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.calls.push(Call::SetBlend(enabled));
    }
}
