use crate::material::MaterialHandle;
use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};
use std::sync::Arc;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
            tangent: [1.0, 0.0, 0.0],
            bitangent: [0.0, 1.0, 0.0],
        }
    }
}

/// Indexed triangle list with an optional material. Meshes without one draw with the default.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    material: Option<MaterialHandle>,
}

impl Mesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices, material: None }
    }

    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = Some(material);
        self
    }

    pub fn material(&self) -> Option<&MaterialHandle> {
        self.material.as_ref()
    }

    /// Replaces the handle. Other meshes sharing the previous material are unaffected.
    pub fn set_material(&mut self, material: Option<MaterialHandle>) {
        self.material = material;
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Square on the XZ plane facing +Y.
    pub fn plane(size: f32) -> Self {
        let hs = size * 0.5;
        let vertices = vec![
            MeshVertex::new(Vec3::new(-hs, 0.0, hs), Vec3::Y, Vec2::new(0.0, 0.0)),
            MeshVertex::new(Vec3::new(hs, 0.0, hs), Vec3::Y, Vec2::new(1.0, 0.0)),
            MeshVertex::new(Vec3::new(hs, 0.0, -hs), Vec3::Y, Vec2::new(1.0, 1.0)),
            MeshVertex::new(Vec3::new(-hs, 0.0, -hs), Vec3::Y, Vec2::new(0.0, 1.0)),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        Self::with_tangents(vertices, indices)
    }

    pub fn cube(size: f32) -> Self {
        let hs = size * 0.5;
        let positions = [
            Vec3::new(-hs, -hs, -hs),
            Vec3::new(hs, -hs, -hs),
            Vec3::new(hs, hs, -hs),
            Vec3::new(-hs, hs, -hs),
            Vec3::new(-hs, -hs, hs),
            Vec3::new(hs, -hs, hs),
            Vec3::new(hs, hs, hs),
            Vec3::new(-hs, hs, hs),
        ];
        let uv_quad = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        let mut vertices = Vec::with_capacity(24);
        let mut write_face = |corners: [usize; 4], normal: Vec3| {
            for (i, &corner) in corners.iter().enumerate() {
                vertices.push(MeshVertex::new(positions[corner], normal, uv_quad[i]));
            }
        };

        write_face([0, 3, 2, 1], Vec3::NEG_Z); // back
        write_face([4, 5, 6, 7], Vec3::Z); // front
        write_face([0, 4, 7, 3], Vec3::NEG_X); // left
        write_face([1, 2, 6, 5], Vec3::X); // right
        write_face([3, 7, 6, 2], Vec3::Y); // top
        write_face([0, 1, 5, 4], Vec3::NEG_Y); // bottom

        let mut indices = Vec::with_capacity(36);
        for face in 0..6 {
            let base = face * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::with_tangents(vertices, indices)
    }

    /// UV sphere. `sectors` and `stacks` are clamped to 3 and 2.
    pub fn sphere(radius: f32, sectors: u32, stacks: u32) -> Self {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);
        let mut vertices = Vec::with_capacity(((sectors + 1) * (stacks + 1)) as usize);
        for stack in 0..=stacks {
            let v = stack as f32 / stacks as f32;
            let polar = v * PI;
            for sector in 0..=sectors {
                let u = sector as f32 / sectors as f32;
                let azimuth = u * TAU;
                let normal = Vec3::new(polar.sin() * azimuth.cos(), polar.cos(), polar.sin() * azimuth.sin());
                vertices.push(MeshVertex::new(normal * radius, normal, Vec2::new(u, v)));
            }
        }

        let row = sectors + 1;
        let mut indices = Vec::with_capacity((sectors * stacks * 6) as usize);
        for stack in 0..stacks {
            for sector in 0..sectors {
                let a = stack * row + sector;
                let b = a + row;
                if stack != 0 {
                    indices.extend_from_slice(&[a, a + 1, b]);
                }
                if stack != stacks - 1 {
                    indices.extend_from_slice(&[a + 1, b + 1, b]);
                }
            }
        }
        Self::with_tangents(vertices, indices)
    }

    fn with_tangents(mut vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        compute_tangents(&mut vertices, &indices);
        Self::new(vertices, indices)
    }
}

/// A group of meshes submitted together.
#[derive(Clone, Debug, Default)]
pub struct Model {
    meshes: Vec<Arc<Mesh>>,
}

impl Model {
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self { meshes: meshes.into_iter().map(Arc::new).collect() }
    }

    pub fn from_mesh(mesh: Mesh) -> Self {
        Self::new(vec![mesh])
    }

    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    pub fn push(&mut self, mesh: Mesh) {
        self.meshes.push(Arc::new(mesh));
    }

    /// Points every mesh at `material`, copying meshes whose geometry is shared elsewhere.
    pub fn set_material_all(&mut self, material: &MaterialHandle) {
        for mesh in &mut self.meshes {
            Arc::make_mut(mesh).set_material(Some(Arc::clone(material)));
        }
    }
}

fn compute_tangents(vertices: &mut [MeshVertex], indices: &[u32]) {
    if vertices.is_empty() || indices.is_empty() {
        return;
    }
    let mut tan1 = vec![Vec3::ZERO; vertices.len()];
    let mut tan2 = vec![Vec3::ZERO; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }

        let v0 = Vec3::from_array(vertices[i0].position);
        let v1 = Vec3::from_array(vertices[i1].position);
        let v2 = Vec3::from_array(vertices[i2].position);
        let uv0 = Vec2::from_array(vertices[i0].uv);
        let uv1 = Vec2::from_array(vertices[i1].uv);
        let uv2 = Vec2::from_array(vertices[i2].uv);

        let delta_pos1 = v1 - v0;
        let delta_pos2 = v2 - v0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        let denom = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if denom.abs() < 1e-8 {
            continue;
        }
        let r = 1.0 / denom;
        let sdir = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        let tdir = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;
        for i in [i0, i1, i2] {
            tan1[i] += sdir;
            tan2[i] += tdir;
        }
    }

    for (i, vertex) in vertices.iter_mut().enumerate() {
        let normal = Vec3::from_array(vertex.normal);
        let t1 = tan1[i];
        let tangent = (t1 - normal * normal.dot(t1)).normalize_or_zero();
        let tangent = if tangent == Vec3::ZERO { fallback_tangent(normal) } else { tangent };
        let handedness = if normal.cross(tangent).dot(tan2[i]) < 0.0 { -1.0 } else { 1.0 };
        vertex.tangent = tangent.to_array();
        vertex.bitangent = (normal.cross(tangent) * handedness).to_array();
    }
}

fn fallback_tangent(normal: Vec3) -> Vec3 {
    let reference = if normal.x.abs() < 0.9 { Vec3::X } else { Vec3::Z };
    (reference - normal * normal.dot(reference)).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialLibrary;

    fn assert_frames_orthonormal(mesh: &Mesh) {
        for vertex in &mesh.vertices {
            let n = Vec3::from_array(vertex.normal);
            let t = Vec3::from_array(vertex.tangent);
            let b = Vec3::from_array(vertex.bitangent);
            assert!(t.dot(n).abs() < 1e-4, "tangent not perpendicular: {vertex:?}");
            assert!(b.dot(n).abs() < 1e-4, "bitangent not perpendicular: {vertex:?}");
            assert!((t.length() - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn procedural_meshes_have_valid_indices_and_frames() {
        for mesh in [Mesh::plane(2.0), Mesh::cube(1.0), Mesh::sphere(1.0, 16, 8)] {
            assert_eq!(mesh.indices.len() % 3, 0);
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
            assert_frames_orthonormal(&mesh);
        }
    }

    #[test]
    fn plane_tangent_follows_u() {
        let plane = Mesh::plane(1.0);
        let t = Vec3::from_array(plane.vertices[0].tangent);
        assert!((t - Vec3::X).length() < 1e-5, "{t:?}");
    }

    #[test]
    fn sphere_vertices_sit_on_the_radius() {
        let sphere = Mesh::sphere(2.5, 12, 6);
        assert_eq!(sphere.vertices.len(), 13 * 7);
        for vertex in &sphere.vertices {
            assert!((Vec3::from_array(vertex.position).length() - 2.5).abs() < 1e-4);
        }
    }

    #[test]
    fn set_material_all_leaves_other_models_alone() {
        let mut a = Model::from_mesh(Mesh::cube(1.0).with_material(MaterialLibrary::rubber()));
        let b = a.clone();
        a.set_material_all(&MaterialLibrary::gold());
        assert_eq!(a.meshes()[0].material().map(|m| m.name()), Some("gold"));
        assert_eq!(b.meshes()[0].material().map(|m| m.name()), Some("rubber"));
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 56);
        assert_eq!(bytemuck::cast_slice::<MeshVertex, u8>(&Mesh::plane(1.0).vertices).len(), 4 * 56);
    }
}
