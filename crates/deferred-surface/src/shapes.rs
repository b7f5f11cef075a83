//! Procedural meshes for the demo scene, the light markers and the sky cube

use glam::Vec3;

use crate::Vertex;

/// Indexed triangle list
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends `other`, rebasing its indices.
    pub fn append(&mut self, other: &MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

/// Horizontal square at y = 0 facing +Y.
pub fn plane(half_extent: f32) -> MeshData {
    let h = half_extent;
    let n = [0.0, 1.0, 0.0];
    MeshData {
        vertices: vec![
            Vertex::new([-h, 0.0, -h], n, [0.0, 0.0]),
            Vertex::new([-h, 0.0, h], n, [0.0, 1.0]),
            Vertex::new([h, 0.0, h], n, [1.0, 1.0]),
            Vertex::new([h, 0.0, -h], n, [1.0, 0.0]),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Axis-aligned cube centered at the origin with side `2 * half_extent`.
pub fn cube(half_extent: f32) -> MeshData {
    // (normal, u, v) with u x v = normal so every face winds counter-clockwise
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut mesh = MeshData::default();
    for (normal, u, v) in faces {
        let base = mesh.vertices.len() as u32;
        for (cu, cv) in corners {
            let p = (normal + u * cu + v * cv) * half_extent;
            mesh.vertices.push(Vertex::new(
                p.to_array(),
                normal.to_array(),
                [(cu + 1.0) * 0.5, (cv + 1.0) * 0.5],
            ));
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Latitude/longitude sphere.
pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = MeshData::default();

    for r in 0..=rings {
        let phi = std::f32::consts::PI * r as f32 / rings as f32;
        for s in 0..=segments {
            let theta = std::f32::consts::TAU * s as f32 / segments as f32;
            let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            mesh.vertices.push(Vertex::new(
                (n * radius).to_array(),
                n.to_array(),
                [s as f32 / segments as f32, r as f32 / rings as f32],
            ));
        }
    }

    let stride = segments + 1;
    for r in 0..rings {
        for s in 0..segments {
            let i0 = r * stride + s;
            let i1 = i0 + stride;
            mesh.indices.extend_from_slice(&[i0, i0 + 1, i1, i0 + 1, i1 + 1, i1]);
        }
    }
    mesh
}

/// Ring around the Y axis.
pub fn torus(major_radius: f32, minor_radius: f32, segments: u32, sides: u32) -> MeshData {
    let segments = segments.max(3);
    let sides = sides.max(3);
    let mut mesh = MeshData::default();

    for s in 0..=segments {
        let u = std::f32::consts::TAU * s as f32 / segments as f32;
        let (su, cu) = u.sin_cos();
        for k in 0..=sides {
            let v = std::f32::consts::TAU * k as f32 / sides as f32;
            let (sv, cv) = v.sin_cos();
            let n = Vec3::new(cv * cu, sv, cv * su);
            let p = Vec3::new((major_radius + minor_radius * cv) * cu, minor_radius * sv, (major_radius + minor_radius * cv) * su);
            mesh.vertices.push(Vertex::new(
                p.to_array(),
                n.to_array(),
                [s as f32 / segments as f32, k as f32 / sides as f32],
            ));
        }
    }

    let stride = sides + 1;
    for s in 0..segments {
        for k in 0..sides {
            let i0 = s * stride + k;
            let i1 = i0 + stride;
            mesh.indices.extend_from_slice(&[i0, i1, i0 + 1, i0 + 1, i1, i1 + 1]);
        }
    }
    mesh
}

/// Transforms every vertex of `mesh` in place.
pub fn transform(mesh: &mut MeshData, matrix: glam::Mat4) {
    let normal_matrix = matrix.inverse().transpose();
    for v in &mut mesh.vertices {
        v.position = matrix.transform_point3(Vec3::from(v.position)).to_array();
        v.normal = normal_matrix
            .transform_vector3(Vec3::from(v.normal))
            .normalize_or_zero()
            .to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(mesh: &MeshData, tri: usize) -> Vec3 {
        let p = |i: usize| Vec3::from(mesh.vertices[mesh.indices[tri * 3 + i] as usize].position);
        (p(1) - p(0)).cross(p(2) - p(0))
    }

    #[test]
    fn test_plane_faces_up() {
        let mesh = plane(2.0);
        assert_eq!(mesh.triangle_count(), 2);
        for tri in 0..2 {
            assert!(face_normal(&mesh, tri).y > 0.0);
        }
    }

    #[test]
    fn test_cube_winds_outward() {
        let mesh = cube(0.5);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        for tri in 0..12 {
            let n = face_normal(&mesh, tri);
            let stored = Vec3::from(mesh.vertices[mesh.indices[tri * 3] as usize].normal);
            assert!(n.dot(stored) > 0.0, "triangle {tri} winds inward");
        }
    }

    #[test]
    fn test_sphere_radius_and_winding() {
        let mesh = uv_sphere(1.5, 16, 8);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.position).length() - 1.5).abs() < 1e-4);
        }
        // Skip the degenerate triangles at the poles
        let mut checked = 0;
        for tri in 0..mesh.triangle_count() {
            let n = face_normal(&mesh, tri);
            if n.length() < 1e-6 {
                continue;
            }
            let centroid = (0..3)
                .map(|i| Vec3::from(mesh.vertices[mesh.indices[tri * 3 + i] as usize].position))
                .sum::<Vec3>();
            assert!(n.dot(centroid) > 0.0);
            checked += 1;
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_append_rebases_indices() {
        let mut a = plane(1.0);
        let b = plane(1.0);
        a.append(&b);
        assert_eq!(a.vertices.len(), 8);
        assert_eq!(&a.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }
}
