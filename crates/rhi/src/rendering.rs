//! Dynamic rendering attachment descriptions.
//!
//! Small builders over `VkRenderingAttachmentInfo` so pass recording reads
//! as a declaration: which view, which layout, clear or load, store or
//! discard.

use ash::vk;

/// Configuration for one color attachment.
#[derive(Clone)]
pub struct ColorAttachment {
    view: vk::ImageView,
    layout: vk::ImageLayout,
    load_op: vk::AttachmentLoadOp,
    store_op: vk::AttachmentStoreOp,
    clear_value: vk::ClearColorValue,
}

impl ColorAttachment {
    /// Creates an attachment that clears to opaque black and stores.
    pub fn new(view: vk::ImageView) -> Self {
        Self {
            view,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            clear_value: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        }
    }

    /// Uses the given layout during rendering.
    pub fn layout(mut self, layout: vk::ImageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the clear color.
    pub fn clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_value = vk::ClearColorValue { float32: color };
        self
    }

    /// Converts to the Vulkan attachment info.
    pub fn to_vk(&self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.view)
            .image_layout(self.layout)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .clear_value(vk::ClearValue {
                color: self.clear_value,
            })
    }
}

/// Configuration for the depth attachment.
#[derive(Clone)]
pub struct DepthAttachment {
    view: vk::ImageView,
    layout: vk::ImageLayout,
    load_op: vk::AttachmentLoadOp,
    store_op: vk::AttachmentStoreOp,
}

impl DepthAttachment {
    /// Creates an attachment that clears to far depth and stores.
    pub fn new(view: vk::ImageView) -> Self {
        Self {
            view,
            layout: vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
        }
    }

    /// Uses the given layout during rendering.
    pub fn layout(mut self, layout: vk::ImageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Loads the existing contents instead of clearing (passes that re-use
    /// the prepass depth).
    pub fn load(mut self) -> Self {
        self.load_op = vk::AttachmentLoadOp::LOAD;
        self
    }

    /// Discards the contents after the pass.
    pub fn dont_store(mut self) -> Self {
        self.store_op = vk::AttachmentStoreOp::DONT_CARE;
        self
    }

    /// Converts to the Vulkan attachment info.
    pub fn to_vk(&self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.view)
            .image_layout(self.layout)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            })
    }
}

/// Builds a `VkRenderingInfo` covering `extent` with the given attachments.
pub fn rendering_info<'a>(
    extent: vk::Extent2D,
    color_attachments: &'a [vk::RenderingAttachmentInfo<'a>],
    depth_attachment: Option<&'a vk::RenderingAttachmentInfo<'a>>,
) -> vk::RenderingInfo<'a> {
    let mut info = vk::RenderingInfo::default()
        .render_area(vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        })
        .layer_count(1)
        .color_attachments(color_attachments);

    if let Some(depth) = depth_attachment {
        info = info.depth_attachment(depth);
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachment_defaults() {
        let info = ColorAttachment::new(vk::ImageView::null()).to_vk();
        assert_eq!(info.image_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(info.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(info.store_op, vk::AttachmentStoreOp::STORE);
    }

    #[test]
    fn test_depth_attachment_load_variant() {
        let info = DepthAttachment::new(vk::ImageView::null())
            .load()
            .dont_store()
            .to_vk();
        assert_eq!(info.load_op, vk::AttachmentLoadOp::LOAD);
        assert_eq!(info.store_op, vk::AttachmentStoreOp::DONT_CARE);
    }

    #[test]
    fn test_rendering_info_area() {
        let extent = vk::Extent2D {
            width: 640,
            height: 480,
        };
        let colors = [ColorAttachment::new(vk::ImageView::null()).to_vk()];
        let info = rendering_info(extent, &colors, None);
        assert_eq!(info.render_area.extent.width, 640);
        assert_eq!(info.render_area.extent.height, 480);
        assert_eq!(info.layer_count, 1);
        assert_eq!(info.color_attachment_count, 1);
    }
}
