//! Behavioural tests for the velocity sampler against scripted sources.

use std::cell::RefCell;

use glam::{Mat4, Vec3};
use motion_sampler::geom::{topology_equal, XformOp};
use motion_sampler::prelude::*;
use motion_sampler::source::{MeshKey, ObjectTrack, TransformKey};

/// Source driven by closures. Every snapshot query is recorded.
struct Scripted<P, T> {
    positions: P,
    topology: T,
    queries: RefCell<Vec<Tick>>,
}

impl<P, T> Scripted<P, T>
where
    P: Fn(Tick) -> Vec<Vec3>,
    T: Fn(Tick) -> bool,
{
    /// `topology(t)` returns true when tick `t` has the base topology.
    fn new(positions: P, topology: T) -> Self {
        Self {
            positions,
            topology,
            queries: RefCell::new(Vec::new()),
        }
    }

    fn queried(&self) -> Vec<Tick> {
        self.queries.borrow().clone()
    }
}

impl<P, T> SnapshotSource<TriFaces> for Scripted<P, T>
where
    P: Fn(Tick) -> Vec<Vec3>,
    T: Fn(Tick) -> bool,
{
    type Handle = str;

    fn snapshot(&self, _: &str, time: Tick) -> Result<(Snapshot<TriFaces>, ValidityInterval)> {
        self.queries.borrow_mut().push(time);
        let faces = if (self.topology)(time) {
            vec![[0, 1, 2], [0, 2, 3]]
        } else {
            vec![[0, 1, 3], [1, 2, 3]]
        };
        let snapshot = Snapshot::new((self.positions)(time), TriFaces::new(faces));
        Ok((snapshot, ValidityInterval::instant(time)))
    }

    fn transform(&self, _: &str, _: Tick) -> Result<TransformSample> {
        Ok(TransformSample::identity())
    }
}

fn seconds(t: Tick) -> f32 {
    t as f32 / TICKS_PER_SECOND as f32
}

/// Unit quad shifted along x by `x`.
fn quad_at(x: f32) -> Vec<Vec3> {
    vec![
        Vec3::new(x, 0.0, 0.0),
        Vec3::new(x + 1.0, 0.0, 0.0),
        Vec3::new(x + 1.0, 1.0, 0.0),
        Vec3::new(x, 1.0, 0.0),
    ]
}

fn assert_vec_near(a: Vec3, b: Vec3, eps: f32) {
    assert!((a - b).abs().max_element() <= eps, "{a:?} != {b:?}");
}

fn tri_key(time: Tick, positions: Vec<Vec3>) -> MeshKey {
    MeshKey::new(time, positions, [[0u32, 1, 2]])
}

fn triangle() -> Vec<Vec3> {
    vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 0.0, 3.0)]
}

#[test]
fn test_static_object() {
    let offset = Vec3::new(5.0, -1.0, 2.0);
    let src = KeyframeSource::new()
        .with_object(
            ObjectTrack::new("rock")
                .mesh_key(tri_key(0, triangle()))
                .transform_key(TransformKey::new(0, vec![XformOp::Translate(offset.to_array())])),
        )
        .unwrap();

    for scale in [0.1, 0.5, 0.9] {
        let sampler = VelocitySampler::new(SamplingPolicy::new().with_time_step_scale(scale));
        let (mesh, validity) = sampler.sample_mesh(&src, "rock", 0, 960).unwrap();
        assert!(!mesh.has_velocities());
        assert!(validity.contains(0) && validity.contains(960));
        for (p, q) in mesh.positions.iter().zip(triangle()) {
            assert_eq!(*p, q + offset);
        }
    }
}

#[test]
fn test_static_validity_is_intersection() {
    let src = KeyframeSource::new()
        .with_object(
            ObjectTrack::new("crate")
                .mesh_key(tri_key(0, triangle()))
                .mesh_key(tri_key(2000, vec![Vec3::ZERO; 3]))
                .transform_key(TransformKey::new(-1000, vec![XformOp::Translate([0.0, 0.0, 0.0])]))
                .transform_key(TransformKey::new(-500, vec![XformOp::Translate([0.0, 3.0, 0.0])])),
        )
        .unwrap();

    let (mesh, validity) = VelocitySampler::default()
        .sample_mesh(&src, "crate", 0, 960)
        .unwrap();
    assert!(!mesh.has_velocities());
    assert_eq!(validity, ValidityInterval::new(-500, 1999));
    assert_vec_near(mesh.positions[0], Vec3::new(1.0, 3.0, 0.0), 1e-6);
}

#[test]
fn test_rigid_motion_independent_of_scale() {
    let m0 = Mat4::IDENTITY;
    let m1 = Mat4::from_rotation_z(90f32.to_radians()) * Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0));
    let (t0, t1) = (0, 480);
    let src = KeyframeSource::new()
        .with_object(
            ObjectTrack::new("arm")
                .mesh_key(tri_key(0, triangle()))
                .transform_key(TransformKey::from_matrix(t0, m0))
                .transform_key(TransformKey::from_matrix(t1, m1)),
        )
        .unwrap();

    let dt = seconds(t1 - t0);
    let expected: Vec<Vec3> = triangle()
        .iter()
        .map(|&p| (m1.transform_point3(p) - m0.transform_point3(p)) / dt)
        .collect();

    for scale in [0.25, 0.5, 0.75] {
        let sampler = VelocitySampler::new(SamplingPolicy::new().with_time_step_scale(scale));
        let (mesh, validity) = sampler.sample_mesh(&src, "arm", t0, t1).unwrap();
        assert!(validity.is_instant());
        let v = mesh.velocities.unwrap();
        for (a, b) in v.iter().zip(&expected) {
            assert_vec_near(*a, *b, 1e-3);
        }
    }
}

#[test]
fn test_topology_break_at_end() {
    let (t0, t1) = (0, 100);
    // Accelerating motion: the difference depends on which tick is used
    let src = Scripted::new(|t| quad_at(seconds(t).powi(2) * 100.0), move |t| t < t1);
    let sampler = VelocitySampler::new(SamplingPolicy::new().with_time_step_scale(0.5));
    let (mesh, validity) = sampler.sample_mesh(&src, "quad", t0, t1).unwrap();

    assert_eq!(validity, ValidityInterval::instant(t0));
    assert_eq!(src.queried(), vec![0, 100, 50]);

    let found = 50;
    let expected = (quad_at(seconds(found).powi(2) * 100.0)[0].x - 0.0) / seconds(found);
    let v = mesh.velocities.unwrap();
    assert!((v[0].x - expected).abs() < 1e-3, "{} vs {expected}", v[0].x);

    let at_end = (quad_at(seconds(t1).powi(2) * 100.0)[0].x) / seconds(t1);
    assert!((v[0].x - at_end).abs() > 1e-3);
}

#[test]
fn test_slow_search_reaches_near_start() {
    // Only the first ten ticks keep the topology; at scale 0.99 the search
    // needs hundreds of distinct candidates to get below tick 10
    let src = Scripted::new(|t| quad_at(2.0 * seconds(t)), |t| (0..=10).contains(&t));
    let sampler = VelocitySampler::new(SamplingPolicy::new().with_time_step_scale(0.99));
    let (mesh, validity) = sampler.sample_mesh(&src, "quad", 0, 4800).unwrap();

    assert_eq!(validity, ValidityInterval::instant(0));
    let queried = src.queried();
    assert!(queried.len() > 256, "{} queries", queried.len());
    assert!((1..=10).contains(queried.last().unwrap()));
    for v in mesh.velocities.unwrap() {
        assert_vec_near(v, Vec3::new(2.0, 0.0, 0.0), 1e-3);
    }
}

#[test]
fn test_backward_fallback_signed() {
    // Constant velocity of 2 units/s along x; only t <= 0 keeps the topology
    let src = Scripted::new(|t| quad_at(2.0 * seconds(t)), |t| t <= 0);
    let sampler = VelocitySampler::default();
    let (mesh, validity) = sampler.sample_mesh(&src, "quad", 0, 240).unwrap();

    assert!(validity.is_instant());
    assert_eq!(*src.queried().last().unwrap(), -1);
    for v in mesh.velocities.unwrap() {
        assert_vec_near(v, Vec3::new(2.0, 0.0, 0.0), 1e-3);
    }
}

#[test]
fn test_total_topology_failure() {
    let src = Scripted::new(|t| quad_at(seconds(t)), |t| t == 10);

    let err = VelocitySampler::default()
        .sample_mesh(&src, "quad", 10, 90)
        .unwrap_err();
    assert!(matches!(err, Error::TopologyInstability { ref object, time: 10 } if object == "quad"));

    let lenient = VelocitySampler::new(SamplingPolicy::new().with_ignore_topology_mismatch(true));
    let (mesh, validity) = lenient.sample_mesh(&src, "quad", 10, 90).unwrap();
    assert!(!mesh.has_velocities());
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.face_count(), 2);
    assert_eq!(validity, ValidityInterval::instant(10));
}

#[test]
fn test_comparator_symmetric_and_reflexive() {
    let src = Scripted::new(quad_at_tick, |t| t % 3 != 0);
    let snaps: Vec<Snapshot<TriFaces>> = (0..6).map(|t| src.snapshot("q", t).unwrap().0).collect();
    for a in &snaps {
        assert!(topology_equal(a, a));
        for b in &snaps {
            assert_eq!(topology_equal(a, b), topology_equal(b, a));
        }
    }
}

fn quad_at_tick(t: Tick) -> Vec<Vec3> {
    quad_at(t as f32)
}

#[test]
fn test_invalid_policy_never_queries_source() {
    for scale in [0.0, 1.0, -0.5, f64::NAN] {
        let src = Scripted::new(quad_at_tick, |_| true);
        let sampler = VelocitySampler::new(SamplingPolicy::new().with_time_step_scale(scale));
        let err = sampler.sample_mesh(&src, "quad", 0, 10).unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy(_)), "scale {scale}: {err}");
        assert!(err.is_configuration());
        assert!(src.queried().is_empty());
    }
}

#[test]
fn test_reversed_range_rejected() {
    let src = Scripted::new(quad_at_tick, |_| true);
    let err = VelocitySampler::default()
        .sample_mesh(&src, "quad", 10, 0)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTimeRange { start: 10, end: 0 }));
    assert!(src.queried().is_empty());
}

#[test]
fn test_unrepresentable_range_rejected() {
    let src = Scripted::new(quad_at_tick, |_| true);
    let err = VelocitySampler::default()
        .sample_mesh(&src, "quad", Tick::MIN, 10)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTimeRange { start: Tick::MIN, end: 10 }));
    assert!(src.queried().is_empty());

    // The widest range that still fits is accepted
    let (_, validity) = VelocitySampler::default()
        .sample_mesh(&src, "quad", Tick::MIN, -1)
        .unwrap();
    assert_eq!(validity, ValidityInterval::instant(Tick::MIN));
}

#[test]
fn test_empty_mesh() {
    let src = KeyframeSource::new()
        .with_object(ObjectTrack::new("void").mesh_key(MeshKey::new(0, vec![], Vec::<Vec<u32>>::new())))
        .unwrap();

    let err = VelocitySampler::default()
        .sample_mesh(&src, "void", 0, 10)
        .unwrap_err();
    assert!(matches!(err, Error::EmptyGeometry { ref object } if object == "void"));

    let lenient = VelocitySampler::new(SamplingPolicy::new().with_ignore_empty_meshes(true));
    let (mesh, validity) = lenient.sample_mesh(&src, "void", 0, 10).unwrap();
    assert!(mesh.is_empty());
    assert!(mesh.channels.is_empty());
    assert_eq!(validity, ValidityInterval::instant(0));
}

#[test]
fn test_direct_velocity_fast_path() {
    let per_tick = Vec3::new(0.0, 0.01, 0.0);
    let key = tri_key(0, triangle()).with_velocities(vec![per_tick; 3]);
    let src = KeyframeSource::new()
        .with_object(ObjectTrack::new("sim").mesh_key(key).mesh_key(tri_key(100, vec![Vec3::ZERO; 3])))
        .unwrap();

    let (mesh, validity) = VelocitySampler::default()
        .sample_mesh(&src, "sim", 0, 200)
        .unwrap();
    assert_eq!(validity, ValidityInterval::instant(0));
    for v in mesh.velocities.unwrap() {
        assert_vec_near(v, per_tick * TICKS_PER_SECOND as f32, 1e-4);
    }

    // Object space ignores the stored velocities and differences against
    // the key held at tick 200
    let object = VelocitySampler::new(SamplingPolicy::new().with_object_space(true));
    let (mesh, _) = object.sample_mesh(&src, "sim", 0, 200).unwrap();
    let v = mesh.velocities.unwrap();
    assert_vec_near(v[0], Vec3::new(-24.0, 0.0, 0.0), 1e-3);
}

#[test]
fn test_polygon_entry_point_parity() {
    let quad = |time, x: f32| MeshKey::new(time, quad_at(x), [[0u32, 1, 2, 3]]);
    let tris = |time, x: f32| MeshKey::new(time, quad_at(x), [[0u32, 1, 2], [0, 2, 3]]);
    let src = KeyframeSource::new()
        .with_object(ObjectTrack::new("poly").mesh_key(quad(0, 0.0)).mesh_key(quad(480, 3.0)))
        .unwrap()
        .with_object(ObjectTrack::new("tri").mesh_key(tris(0, 0.0)).mesh_key(tris(480, 3.0)))
        .unwrap();

    let sampler = VelocitySampler::default();
    let (poly, pv) = sampler.sample_poly_mesh(&src, "poly", 0, 480).unwrap();
    let (tri, tv) = sampler.sample_mesh(&src, "tri", 0, 480).unwrap();

    assert_eq!(pv, tv);
    assert_eq!(poly.positions, tri.positions);
    assert_eq!(poly.velocities, tri.velocities);
    assert_eq!(poly.faces.face_counts, vec![4]);
    assert_vec_near(poly.velocities.unwrap()[0], Vec3::new(30.0, 0.0, 0.0), 1e-3);

    // Quads cannot be viewed as triangles
    let err = sampler.sample_mesh(&src, "poly", 0, 480).unwrap_err();
    assert!(matches!(err, Error::InvalidStructure(_)));
}

#[test]
fn test_cached_source_matches_uncached() {
    let src = Scripted::new(|t| quad_at(seconds(t).powi(2)), |t| t < 300);
    let cached: CachedSource<_, TriFaces> = CachedSource::new(&src);
    let sampler = VelocitySampler::default();

    let direct = sampler.sample_mesh(&src, "quad", 0, 400).unwrap();
    let first = sampler.sample_mesh(&cached, "quad", 0, 400).unwrap();
    let second = sampler.sample_mesh(&cached, "quad", 0, 400).unwrap();

    assert_eq!(direct, first);
    assert_eq!(first, second);
    // 0, 400 and 200 once for the direct run and once to fill the cache
    assert_eq!(src.queried(), vec![0, 400, 200, 0, 400, 200]);
    assert!(cached.stats().hits >= 3);
}

#[test]
fn test_source_errors_propagate() {
    let src = KeyframeSource::new();
    let err = VelocitySampler::default()
        .sample_mesh(&src, "nobody", 0, 10)
        .unwrap_err();
    assert!(matches!(err, Error::ObjectNotFound(ref n) if n == "nobody"));
}
