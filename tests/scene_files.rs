//! Integration tests for JSON scene files and policies on disk.

use std::io::Write;

use glam::{Vec2, Vec3};
use motion_sampler::geom::{Channel, ChannelData, XformOp};
use motion_sampler::prelude::*;
use motion_sampler::source::{Interpolation, MeshKey, ObjectTrack, Scene, TransformKey};

use tempfile::NamedTempFile;

const SCENE: &str = r#"{
  "policy": { "time_step_scale": 0.25, "ignore_topology_mismatch": true },
  "objects": [
    {
      "name": "spinner",
      "transform_keys": [
        { "time": 0, "ops": [] },
        { "time": 4800, "ops": [{ "translate": [4, 0, 0] }] }
      ],
      "mesh_keys": [
        {
          "time": 0,
          "positions": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
          "faces": [[0, 1, 2, 3]],
          "channels": [
            { "name": "mat", "scope": "face", "type": "int", "values": [7] }
          ]
        }
      ]
    },
    {
      "name": "blob",
      "interpolation": "linear",
      "mesh_keys": [
        { "time": 0, "positions": [[0, 0, 0], [1, 0, 0], [0, 1, 0]], "faces": [[0, 1, 2]] },
        { "time": 960, "positions": [[0, 0, 2], [1, 0, 2], [0, 1, 2]], "faces": [[0, 1, 2]] },
        { "time": 1920, "positions": [[0, 0, 0], [1, 0, 0], [0, 1, 0], [1, 1, 0]], "faces": [[0, 1, 2], [1, 3, 2]] }
      ]
    }
  ]
}"#;

fn write_temp(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(text.as_bytes()).expect("Failed to write temp file");
    file
}

#[test]
fn test_load_scene_file() {
    let file = write_temp(SCENE);
    let source = KeyframeSource::load(file.path()).expect("Failed to load scene");

    assert_eq!(source.len(), 2);
    assert_eq!(source.names().collect::<Vec<_>>(), vec!["spinner", "blob"]);
    let policy = source.policy().expect("scene policy");
    assert_eq!(policy.time_step_scale, 0.25);
    assert!(policy.ignore_topology_mismatch);
    assert!(!policy.ignore_empty_meshes);

    let spinner = source.object("spinner").unwrap();
    assert!(!spinner.is_triangulated());
    assert_eq!(spinner.interpolation, Interpolation::Step);
    assert_eq!(source.object("blob").unwrap().interpolation, Interpolation::Linear);
}

#[test]
fn test_sample_loaded_scene() {
    let file = write_temp(SCENE);
    let source = KeyframeSource::load(file.path()).unwrap();
    let sampler = VelocitySampler::new(source.policy().cloned().unwrap_or_default());

    // Rigid translation of 4 units per second, polygons kept
    let (mesh, validity) = sampler.sample_poly_mesh(&source, "spinner", 0, 480).unwrap();
    assert!(validity.is_instant());
    for v in mesh.velocities.as_ref().unwrap() {
        assert!((*v - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-3);
    }
    assert_eq!(mesh.channels.len(), 1);
    assert_eq!(mesh.channels[0].data, ChannelData::Int(vec![7]));

    // Linear segment: 2 units over 960 ticks
    let (mesh, _) = sampler.sample_mesh(&source, "blob", 0, 480).unwrap();
    let v = mesh.velocities.unwrap();
    assert!((v[0].z - 10.0).abs() < 1e-3);

    // Topology changes at 1920 and stays; the tick before start still matches
    let (mesh, validity) = sampler.sample_mesh(&source, "blob", 1919, 2400).unwrap();
    assert_eq!(validity, ValidityInterval::instant(1919));
    assert!(mesh.has_velocities());
}

#[test]
fn test_scene_round_trip() {
    let scene = Scene {
        policy: Some(SamplingPolicy::new().with_max_search_iterations(32)),
        objects: vec![ObjectTrack::new("prop")
            .with_interpolation(Interpolation::Linear)
            .mesh_key(
                MeshKey::new(0, vec![Vec3::ZERO, Vec3::X, Vec3::Y], [[0u32, 1, 2]])
                    .with_channel(Channel::vertex("uv", ChannelData::Vec2(vec![Vec2::ZERO, Vec2::X, Vec2::Y]))),
            )
            .transform_key(TransformKey::new(0, vec![XformOp::RotateY(45.0), XformOp::Scale([2.0, 2.0, 2.0])]))],
    };

    let file = write_temp(&scene.to_json_string().unwrap());
    let text = std::fs::read_to_string(file.path()).unwrap();
    let loaded = Scene::from_json_str(&text).unwrap();
    assert_eq!(loaded, scene);

    let source = KeyframeSource::from_scene(loaded).unwrap();
    assert_eq!(source.policy().unwrap().max_search_iterations, Some(32));
}

#[test]
fn test_policy_file() {
    let file = write_temp(r#"{ "time_step_scale": 0.75, "use_object_space": true }"#);
    let policy = SamplingPolicy::load(file.path()).unwrap();
    assert_eq!(policy.time_step_scale, 0.75);
    assert!(policy.use_object_space);
    assert_eq!(policy.max_search_iterations, SamplingPolicy::default().max_search_iterations);

    let bad = write_temp(r#"{ "time_step_scale": 1.5 }"#);
    assert!(matches!(SamplingPolicy::load(bad.path()), Err(Error::InvalidPolicy(_))));
}

#[test]
fn test_broken_scene_rejected() {
    // Face references a vertex that does not exist
    let file = write_temp(
        r#"{ "objects": [{ "name": "bad", "mesh_keys": [
            { "time": 0, "positions": [[0, 0, 0]], "faces": [[0, 1, 2]] }
        ] }] }"#,
    );
    assert!(matches!(KeyframeSource::load(file.path()), Err(Error::InvalidStructure(_))));

    assert!(matches!(
        KeyframeSource::load("/nonexistent/scene.json"),
        Err(Error::Io(_))
    ));
    let garbage = write_temp("{ not json");
    assert!(matches!(KeyframeSource::load(garbage.path()), Err(Error::Json(_))));
}
