//! In-memory keyframed snapshot source.
//!
//! Each object is an [`ObjectTrack`]: sorted mesh keys plus sorted
//! transform keys. Between keys, meshes either hold (step) or blend
//! linearly when both neighbours share topology; transforms always blend.
//! Validity intervals follow from that: a held value is valid up to the
//! tick before the next differing key, a blended value only at its tick.
//!
//! Scenes can be written as JSON:
//!
//! ```json
//! {
//!   "policy": { "time_step_scale": 0.5 },
//!   "objects": [{
//!     "name": "cube",
//!     "interpolation": "linear",
//!     "mesh_keys": [{ "time": 0, "positions": [[0,0,0],[1,0,0],[0,1,0]], "faces": [[0,1,2]] }],
//!     "transform_keys": [{ "time": 0, "ops": [{ "translate": [0, 0, 1] }] }]
//!   }]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::SnapshotSource;
use crate::core::{SamplingPolicy, ValidityInterval};
use crate::geom::{
    compose_ops, faces_equal, lerp_matrix, Channel, PolyFaces, Snapshot, TransformSample, TriFaces,
    XformOp,
};
use crate::util::{Error, Result, Tick};

/// How mesh keys are blended between key times.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Hold the previous key until the next one.
    #[default]
    Step,
    /// Blend positions between keys that share topology.
    Linear,
}

/// Serialize polygon faces as one index list per face.
mod polygon_lists {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::geom::PolyFaces;

    pub fn serialize<S: Serializer>(faces: &PolyFaces, s: S) -> Result<S::Ok, S::Error> {
        faces.to_polygons().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PolyFaces, D::Error> {
        let polygons = Vec::<Vec<u32>>::deserialize(d)?;
        Ok(PolyFaces::from_polygons(polygons))
    }
}

/// Mesh state at one key time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshKey {
    pub time: Tick,
    pub positions: Vec<Vec3>,
    #[serde(with = "polygon_lists")]
    pub faces: PolyFaces,
    /// Output-space velocities in units per tick, for producers that know them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocities: Option<Vec<Vec3>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
}

impl MeshKey {
    pub fn new<I, P>(time: Tick, positions: Vec<Vec3>, polygons: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u32]>,
    {
        Self {
            time,
            positions,
            faces: PolyFaces::from_polygons(polygons),
            velocities: None,
            channels: Vec::new(),
        }
    }

    pub fn with_velocities(mut self, velocities: Vec<Vec3>) -> Self {
        self.velocities = Some(velocities);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Same geometry, ignoring the key time.
    fn same_content(&self, other: &Self) -> bool {
        self.positions == other.positions
            && self.faces == other.faces
            && self.velocities == other.velocities
            && self.channels == other.channels
    }

    fn same_topology(&self, other: &Self) -> bool {
        self.positions.len() == other.positions.len() && faces_equal(&self.faces, &other.faces)
    }

    fn snapshot(&self) -> Snapshot<PolyFaces> {
        Snapshot {
            positions: self.positions.clone(),
            faces: self.faces.clone(),
            channels: self.channels.clone(),
        }
    }
}

/// Transform op stack at one key time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformKey {
    pub time: Tick,
    #[serde(default)]
    pub ops: Vec<XformOp>,
}

impl TransformKey {
    pub fn new(time: Tick, ops: Vec<XformOp>) -> Self {
        Self { time, ops }
    }

    /// Key holding a raw matrix.
    pub fn from_matrix(time: Tick, matrix: Mat4) -> Self {
        Self::new(time, vec![XformOp::Matrix(matrix.transpose().to_cols_array())])
    }
}

/// Keyframed animation of one object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectTrack {
    pub name: String,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub mesh_keys: Vec<MeshKey>,
    #[serde(default)]
    pub transform_keys: Vec<TransformKey>,
}

impl ObjectTrack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interpolation: Interpolation::Step,
            mesh_keys: Vec::new(),
            transform_keys: Vec::new(),
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn mesh_key(mut self, key: MeshKey) -> Self {
        self.mesh_keys.push(key);
        self
    }

    pub fn transform_key(mut self, key: TransformKey) -> Self {
        self.transform_keys.push(key);
        self
    }

    /// True if every mesh key is made of triangles.
    pub fn is_triangulated(&self) -> bool {
        self.mesh_keys
            .iter()
            .all(|k| k.faces.face_counts.iter().all(|&c| c == 3))
    }

    /// Sort keys and check each mesh key.
    fn prepare(&mut self) -> Result<()> {
        self.mesh_keys.sort_by_key(|k| k.time);
        self.transform_keys.sort_by_key(|k| k.time);

        let dup_mesh = self.mesh_keys.windows(2).find(|w| w[0].time == w[1].time);
        let dup_xform = self.transform_keys.windows(2).find(|w| w[0].time == w[1].time);
        if let Some(time) = dup_mesh.map(|w| w[0].time).or(dup_xform.map(|w| w[0].time)) {
            return Err(Error::invalid(format!(
                "object '{}' has two keys at tick {time}",
                self.name
            )));
        }

        for key in &self.mesh_keys {
            let check = || -> Result<()> {
                if key.faces.face_counts.iter().map(|&c| c as usize).sum::<usize>()
                    != key.faces.face_indices.len()
                {
                    return Err(Error::invalid("face counts disagree with face indices"));
                }
                key.snapshot().validate()?;
                if let Some(v) = &key.velocities {
                    if v.len() != key.positions.len() {
                        return Err(Error::ChannelLength {
                            name: crate::geom::VELOCITY_CHANNEL.to_string(),
                            expected: key.positions.len(),
                            actual: v.len(),
                        });
                    }
                }
                Ok(())
            };
            check().map_err(|e| {
                Error::invalid(format!("object '{}', key at tick {}: {e}", self.name, key.time))
            })?;
        }
        Ok(())
    }

    /// Floor key at `t`, or the first key when `t` precedes every key.
    fn key_at(&self, t: Tick) -> Option<&MeshKey> {
        let count = self.mesh_keys.partition_point(|k| k.time <= t);
        self.mesh_keys.get(count.saturating_sub(1))
    }

    fn mesh_at(&self, t: Tick) -> (Snapshot<PolyFaces>, ValidityInterval) {
        let keys = &self.mesh_keys;
        if keys.is_empty() {
            return (Snapshot::default(), ValidityInterval::FOREVER);
        }
        let times: Vec<Tick> = keys.iter().map(|k| k.time).collect();
        let loc = locate(&times, t);
        let linear = self.interpolation == Interpolation::Linear;
        let animated = |a: usize, b: usize| {
            linear && keys[a].positions != keys[b].positions && keys[a].same_topology(&keys[b])
        };
        let same = |a: usize, b: usize| keys[a].same_content(&keys[b]);

        let key = &keys[loc.index];
        if let Some(next) = loc.next.filter(|_| !loc.before) {
            if animated(loc.index, next) {
                let next_key = &keys[next];
                let s = ((t - key.time) as f64 / (next_key.time - key.time) as f64) as f32;
                let mut snapshot = key.snapshot();
                for (p, q) in snapshot.positions.iter_mut().zip(&next_key.positions) {
                    *p = p.lerp(*q, s);
                }
                return (snapshot, ValidityInterval::instant(t));
            }
        }

        let validity = if loc.before && keys.len() > 1 && animated(0, 1) {
            ValidityInterval::new(Tick::MIN, keys[0].time)
        } else {
            held_validity(&times, loc.index, same)
        };
        (key.snapshot(), validity)
    }

    fn transform_at(&self, t: Tick) -> TransformSample {
        let keys = &self.transform_keys;
        if keys.is_empty() {
            return TransformSample::identity();
        }
        let times: Vec<Tick> = keys.iter().map(|k| k.time).collect();
        let matrices: Vec<Mat4> = keys.iter().map(|k| compose_ops(&k.ops)).collect();
        let loc = locate(&times, t);
        let same = |a: usize, b: usize| matrices[a] == matrices[b];

        if let Some(next) = loc.next {
            if !same(loc.index, next) {
                if loc.before {
                    return TransformSample::new(
                        matrices[0],
                        ValidityInterval::new(Tick::MIN, times[0]),
                    );
                }
                let s = ((t - times[loc.index]) as f64 / (times[next] - times[loc.index]) as f64) as f32;
                return TransformSample::new(
                    lerp_matrix(&matrices[loc.index], &matrices[next], s),
                    ValidityInterval::instant(t),
                );
            }
        }
        TransformSample::new(matrices[loc.index], held_validity(&times, loc.index, same))
    }
}

/// Position of a tick among sorted key times.
struct KeyLocation {
    /// Floor key, or the first key when `before`.
    index: usize,
    next: Option<usize>,
    /// Tick lies before the first key.
    before: bool,
}

fn locate(times: &[Tick], t: Tick) -> KeyLocation {
    let count = times.partition_point(|&k| k <= t);
    if count == 0 {
        KeyLocation {
            index: 0,
            next: (times.len() > 1).then_some(1),
            before: true,
        }
    } else {
        KeyLocation {
            index: count - 1,
            next: (count < times.len()).then_some(count),
            before: false,
        }
    }
}

/// Interval over which key `i` is held, widened across identical neighbours.
fn held_validity(times: &[Tick], i: usize, same: impl Fn(usize, usize) -> bool) -> ValidityInterval {
    let mut first = i;
    while first > 0 && same(first - 1, first) {
        first -= 1;
    }
    let mut last = i;
    while last + 1 < times.len() && same(last, last + 1) {
        last += 1;
    }
    let start = if first == 0 { Tick::MIN } else { times[first] };
    let end = if last + 1 == times.len() { Tick::MAX } else { times[last + 1] - 1 };
    ValidityInterval::new(start, end)
}

/// Serializable scene: objects plus an optional sampling policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<SamplingPolicy>,
    #[serde(default)]
    pub objects: Vec<ObjectTrack>,
}

impl Scene {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Snapshot source backed by keyframed object tracks.
#[derive(Clone, Debug, Default)]
pub struct KeyframeSource {
    objects: HashMap<String, ObjectTrack>,
    order: Vec<String>,
    policy: Option<SamplingPolicy>,
}

impl KeyframeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a scene, validating every track.
    pub fn from_scene(scene: Scene) -> Result<Self> {
        if let Some(policy) = &scene.policy {
            policy.validate()?;
        }
        let mut source = Self {
            policy: scene.policy,
            ..Self::default()
        };
        for track in scene.objects {
            source.insert(track)?;
        }
        Ok(source)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_scene(Scene::from_json_str(json)?)
    }

    /// Load a JSON scene file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Add or replace an object.
    pub fn insert(&mut self, mut track: ObjectTrack) -> Result<()> {
        track.prepare()?;
        if !self.objects.contains_key(&track.name) {
            self.order.push(track.name.clone());
        }
        self.objects.insert(track.name.clone(), track);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_object(mut self, track: ObjectTrack) -> Result<Self> {
        self.insert(track)?;
        Ok(self)
    }

    /// Object names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectTrack> {
        self.objects.get(name)
    }

    /// Policy embedded in the scene, if any.
    pub fn policy(&self) -> Option<&SamplingPolicy> {
        self.policy.as_ref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn track(&self, name: &str) -> Result<&ObjectTrack> {
        self.objects
            .get(name)
            .ok_or_else(|| Error::ObjectNotFound(name.to_string()))
    }
}

impl SnapshotSource<PolyFaces> for KeyframeSource {
    type Handle = str;

    fn snapshot(&self, handle: &str, time: Tick) -> Result<(Snapshot<PolyFaces>, ValidityInterval)> {
        Ok(self.track(handle)?.mesh_at(time))
    }

    fn transform(&self, handle: &str, time: Tick) -> Result<TransformSample> {
        Ok(self.track(handle)?.transform_at(time))
    }

    fn direct_velocity(&self, handle: &str, time: Tick) -> Result<Option<Vec<Vec3>>> {
        Ok(self
            .track(handle)?
            .key_at(time)
            .and_then(|key| key.velocities.clone()))
    }
}

impl SnapshotSource<TriFaces> for KeyframeSource {
    type Handle = str;

    fn snapshot(&self, handle: &str, time: Tick) -> Result<(Snapshot<TriFaces>, ValidityInterval)> {
        let (snapshot, validity) = SnapshotSource::<PolyFaces>::snapshot(self, handle, time)?;
        let faces = TriFaces::try_from(&snapshot.faces)
            .map_err(|e| Error::invalid(format!("object '{handle}': {e}")))?;
        let snapshot = Snapshot {
            positions: snapshot.positions,
            faces,
            channels: snapshot.channels,
        };
        Ok((snapshot, validity))
    }

    fn transform(&self, handle: &str, time: Tick) -> Result<TransformSample> {
        SnapshotSource::<PolyFaces>::transform(self, handle, time)
    }

    fn direct_velocity(&self, handle: &str, time: Tick) -> Result<Option<Vec<Vec3>>> {
        SnapshotSource::<PolyFaces>::direct_velocity(self, handle, time)
    }
}
