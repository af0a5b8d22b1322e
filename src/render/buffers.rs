use crate::render::context::{AttribLayout, BufferTarget, BufferUsage, DataType, RenderContext};
use crate::render::mesh::Mesh;
use crate::utils::error::{RenderError, Result};

/// Positions are three packed floats per vertex.
pub const POSITION_LAYOUT: AttribLayout = AttribLayout::packed_floats(3);
/// Colors are four packed floats (RGBA) per vertex.
pub const COLOR_LAYOUT: AttribLayout = AttribLayout::packed_floats(4);
pub const INDEX_TYPE: DataType = DataType::UnsignedShort;

/// GPU-resident position, color and index buffers for one static mesh.
#[derive(Debug)]
pub struct GeometryBuffers<C: RenderContext> {
    position: C::Buffer,
    color: C::Buffer,
    index: C::Buffer,
    index_count: i32,
}

impl<C: RenderContext> GeometryBuffers<C> {
    /// Validates `mesh` and uploads it as three static buffers.
    pub fn build(ctx: &C, mesh: &Mesh) -> Result<Self> {
        mesh.validate()?;

        let position = upload(ctx, BufferTarget::Array, bytemuck::cast_slice(&mesh.positions))?;
        let color = match upload(ctx, BufferTarget::Array, bytemuck::cast_slice(&mesh.colors)) {
            Ok(buffer) => buffer,
            Err(err) => {
                ctx.delete_buffer(position);
                return Err(err);
            }
        };
        let index = match upload(
            ctx,
            BufferTarget::ElementArray,
            bytemuck::cast_slice(&mesh.indices),
        ) {
            Ok(buffer) => buffer,
            Err(err) => {
                ctx.delete_buffer(position);
                ctx.delete_buffer(color);
                return Err(err);
            }
        };

        log::debug!(
            "uploaded mesh: {} vertices, {} indices",
            mesh.vertex_count(),
            mesh.index_count()
        );

        Ok(Self {
            position,
            color,
            index,
            index_count: mesh.index_count() as i32,
        })
    }

    /// Replaces all three buffers with `mesh`.
    ///
    /// The new buffers are fully uploaded before the old ones are deleted; if
    /// anything fails the current buffers are left untouched.
    pub fn rebuild(&mut self, ctx: &C, mesh: &Mesh) -> Result<()> {
        let fresh = Self::build(ctx, mesh)?;
        let old = std::mem::replace(self, fresh);
        old.release(ctx);
        Ok(())
    }

    pub fn position(&self) -> C::Buffer {
        self.position
    }

    pub fn color(&self) -> C::Buffer {
        self.color
    }

    pub fn index(&self) -> C::Buffer {
        self.index
    }

    pub fn index_count(&self) -> i32 {
        self.index_count
    }

    pub fn release(self, ctx: &C) {
        ctx.delete_buffer(self.position);
        ctx.delete_buffer(self.color);
        ctx.delete_buffer(self.index);
    }
}

fn upload<C: RenderContext>(ctx: &C, target: BufferTarget, data: &[u8]) -> Result<C::Buffer> {
    let buffer = ctx.create_buffer().map_err(|reason| RenderError::Allocation {
        resource: "buffer",
        reason,
    })?;

    ctx.bind_buffer(target, Some(buffer));
    ctx.buffer_data(target, data, BufferUsage::StaticDraw);
    ctx.bind_buffer(target, None);

    Ok(buffer)
}
