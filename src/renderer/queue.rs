use crate::material::MaterialHandle;
use crate::mesh::Mesh;
use glam::{Mat4, Vec3};
use std::sync::Arc;

/// One queued draw, rebuilt every frame.
#[derive(Clone, Debug)]
pub struct RenderCommand {
    pub mesh: Arc<Mesh>,
    pub material: MaterialHandle,
    pub transform: Mat4,
    pub distance: f32,
}

/// Per-frame draw list. The backing storage is kept between frames.
#[derive(Debug, Default)]
pub struct RenderQueue {
    commands: Vec<RenderCommand>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Queues `mesh` with the distance from `camera_position` to the transform's origin.
    pub fn push(&mut self, mesh: Arc<Mesh>, material: MaterialHandle, transform: Mat4, camera_position: Vec3) {
        let distance = camera_position.distance(transform.w_axis.truncate());
        self.commands.push(RenderCommand { mesh, material, transform, distance });
    }

    /// Stable front-to-back order; equal distances keep submission order.
    pub fn sort_front_to_back(&mut self) {
        self.commands.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.commands.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    fn queue_at(distances: &[f32]) -> RenderQueue {
        let mesh = Arc::new(Mesh::cube(1.0));
        let material = Arc::new(Material::default());
        let mut queue = RenderQueue::new();
        for &d in distances {
            let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, -d));
            queue.push(Arc::clone(&mesh), Arc::clone(&material), transform, Vec3::ZERO);
        }
        queue
    }

    #[test]
    fn sorts_front_to_back() {
        let mut queue = queue_at(&[10.0, 2.0, 7.0]);
        queue.sort_front_to_back();
        let order: Vec<f32> = queue.commands().iter().map(|c| c.distance).collect();
        assert_eq!(order, vec![2.0, 7.0, 10.0]);
    }

    #[test]
    fn equal_distances_keep_submission_order() {
        let mesh_a = Arc::new(Mesh::cube(1.0));
        let mesh_b = Arc::new(Mesh::plane(1.0));
        let material = Arc::new(Material::default());
        let mut queue = RenderQueue::new();
        let transform = Mat4::from_translation(Vec3::X * 3.0);
        queue.push(Arc::clone(&mesh_a), Arc::clone(&material), transform, Vec3::ZERO);
        queue.push(Arc::clone(&mesh_b), Arc::clone(&material), transform, Vec3::ZERO);
        queue.sort_front_to_back();
        assert!(Arc::ptr_eq(&queue.commands()[0].mesh, &mesh_a));
        assert!(Arc::ptr_eq(&queue.commands()[1].mesh, &mesh_b));
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut queue = queue_at(&[1.0, 2.0, 3.0, 4.0]);
        let capacity = queue.capacity();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), capacity);
    }
}
