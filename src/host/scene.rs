//! In-process model of the rendering host's animatable state.
//!
//! Targets are created through factory methods on an explicit [`Scene`] and
//! referred to by opaque [`TargetHandle`]s. Channels are bound to a single
//! target property; the synthesizer only ever sees the [`KeyframeSink`] side.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::KeyframeSink;
use crate::error::{Error, Result};
use crate::keyframes::channel::{EMISSION, SCALE};
use crate::keyframes::Keyframe;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetHandle(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Object,
    MaterialInput,
}

#[derive(Clone, Debug, Serialize)]
struct AnimatedProperty {
    default: f32,
    keyframes: Vec<Keyframe>,
}

impl AnimatedProperty {
    fn new(default: f32) -> Self {
        Self {
            default,
            keyframes: Vec::new(),
        }
    }

    /// One keyframe per frame; a second write to the same frame replaces it.
    fn insert(&mut self, frame: u32, value: f32) {
        let at = self.keyframes.partition_point(|k| k.frame < frame);
        match self.keyframes.get_mut(at) {
            Some(existing) if existing.frame == frame => existing.value = value,
            _ => self.keyframes.insert(at, Keyframe::new(frame, value)),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct SceneTarget {
    name: String,
    kind: TargetKind,
    properties: BTreeMap<String, AnimatedProperty>,
}

#[derive(Clone, Debug, Serialize)]
struct Binding {
    target: String,
    property: String,
    #[serde(skip)]
    handle: TargetHandle,
}

#[derive(Clone, Debug)]
pub struct Scene {
    fps: u32,
    frame_start: u32,
    frame_end: u32,
    targets: Vec<SceneTarget>,
    bindings: BTreeMap<String, Binding>,
}

/// Serialized form handed to the external renderer.
#[derive(Serialize)]
struct SceneExport<'a> {
    fps: u32,
    frame_start: u32,
    frame_end: u32,
    bindings: &'a BTreeMap<String, Binding>,
    targets: &'a [SceneTarget],
}

/// Names used by the default orb rig.
pub const ORB_OBJECT: &str = "Orb";
pub const ORB_MATERIAL: &str = "OrbEmission";
pub const ORB_EMISSION_NODE: &str = "OrbEmissionNode";
pub const EMISSION_STRENGTH: &str = "Strength";

impl Scene {
    pub fn new(fps: u32) -> Self {
        Self {
            fps,
            frame_start: 1,
            frame_end: 1,
            targets: Vec::new(),
            bindings: BTreeMap::new(),
        }
    }

    /// The audio-reactive orb: a scalable object and its emission strength.
    pub fn orb_rig(fps: u32) -> Result<Self> {
        let mut scene = Scene::new(fps);
        let orb = scene.add_object(ORB_OBJECT);
        scene.set_property_default(orb, "location_z", 0.6)?;
        let strength =
            scene.add_material_input(ORB_MATERIAL, ORB_EMISSION_NODE, EMISSION_STRENGTH, 10.0);

        scene.bind_channel(SCALE, orb, "scale")?;
        scene.bind_channel(EMISSION, strength, EMISSION_STRENGTH)?;
        Ok(scene)
    }

    /// Objects expose uniform `scale`, `location_z` and `rotation_z`.
    pub fn add_object(&mut self, name: &str) -> TargetHandle {
        let properties = BTreeMap::from([
            ("scale".to_string(), AnimatedProperty::new(1.0)),
            ("location_z".to_string(), AnimatedProperty::new(0.0)),
            ("rotation_z".to_string(), AnimatedProperty::new(0.0)),
        ]);
        self.push_target(name.to_string(), TargetKind::Object, properties)
    }

    /// A single numeric input on a shader node, addressed as `material/node`.
    pub fn add_material_input(
        &mut self,
        material: &str,
        node: &str,
        input: &str,
        default: f32,
    ) -> TargetHandle {
        let properties = BTreeMap::from([(input.to_string(), AnimatedProperty::new(default))]);
        self.push_target(
            format!("{}/{}", material, node),
            TargetKind::MaterialInput,
            properties,
        )
    }

    fn push_target(
        &mut self,
        name: String,
        kind: TargetKind,
        properties: BTreeMap<String, AnimatedProperty>,
    ) -> TargetHandle {
        self.targets.push(SceneTarget {
            name,
            kind,
            properties,
        });
        TargetHandle(self.targets.len() - 1)
    }

    pub fn find_target(&self, name: &str) -> Option<TargetHandle> {
        self.targets
            .iter()
            .position(|t| t.name == name)
            .map(TargetHandle)
    }

    fn target(&self, handle: TargetHandle) -> Result<&SceneTarget> {
        self.targets.get(handle.0).ok_or_else(|| Error::MissingProperty {
            target: format!("#{}", handle.0),
            property: String::new(),
        })
    }

    fn property_mut(&mut self, handle: TargetHandle, property: &str) -> Result<&mut AnimatedProperty> {
        let target = self
            .targets
            .get_mut(handle.0)
            .ok_or_else(|| Error::MissingProperty {
                target: format!("#{}", handle.0),
                property: property.to_string(),
            })?;
        let name = &target.name;
        target
            .properties
            .get_mut(property)
            .ok_or_else(|| Error::MissingProperty {
                target: name.clone(),
                property: property.to_string(),
            })
    }

    pub fn set_property_default(&mut self, handle: TargetHandle, property: &str, value: f32) -> Result<()> {
        self.property_mut(handle, property)?.default = value;
        Ok(())
    }

    /// Route `channel` to `property` on `handle`. Rebinding replaces the route.
    pub fn bind_channel(&mut self, channel: &str, handle: TargetHandle, property: &str) -> Result<()> {
        let target = self.target(handle)?;
        if !target.properties.contains_key(property) {
            return Err(Error::MissingProperty {
                target: target.name.clone(),
                property: property.to_string(),
            });
        }
        let binding = Binding {
            target: target.name.clone(),
            property: property.to_string(),
            handle,
        };
        log::debug!("Bound channel '{}' to {}.{}", channel, binding.target, property);
        self.bindings.insert(channel.to_string(), binding);
        Ok(())
    }

    #[cfg(test)]
    pub fn keyframes(&self, handle: TargetHandle, property: &str) -> Option<&[Keyframe]> {
        self.targets
            .get(handle.0)?
            .properties
            .get(property)
            .map(|p| p.keyframes.as_slice())
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frame_end(&self) -> u32 {
        self.frame_end
    }

    pub fn to_json(&self) -> Result<String> {
        let export = SceneExport {
            fps: self.fps,
            frame_start: self.frame_start,
            frame_end: self.frame_end,
            bindings: &self.bindings,
            targets: &self.targets,
        };
        serde_json::to_string_pretty(&export).map_err(|e| Error::Io(e.into()))
    }

    /// Export the animated scene, creating parent directories as needed.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::debug!("Exported scene: {}", path.display());
        Ok(())
    }
}

impl KeyframeSink for Scene {
    fn require_channel(&self, channel: &str) -> Result<()> {
        if self.bindings.contains_key(channel) {
            Ok(())
        } else {
            Err(Error::MissingChannel(channel.to_string()))
        }
    }

    fn set_channel_at_frame(&mut self, channel: &str, frame: u32, value: f32) -> Result<()> {
        let binding = self
            .bindings
            .get(channel)
            .ok_or_else(|| Error::MissingChannel(channel.to_string()))?;
        let (handle, property) = (binding.handle, binding.property.clone());
        self.property_mut(handle, &property)?.insert(frame, value);
        Ok(())
    }

    fn set_timeline_end(&mut self, frame: u32) -> Result<()> {
        if frame < self.frame_start {
            return Err(Error::invalid(
                "timeline end",
                format!("frame {} precedes start frame {}", frame, self.frame_start),
            ));
        }
        self.frame_end = frame;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframes::channel::SynthesisParams;
    use crate::keyframes::synthesize::{commit, synthesize};
    use crate::record::AnalysisResult;
    use approx::assert_relative_eq;

    #[test]
    fn rig_binds_default_channels() {
        let scene = Scene::orb_rig(30).unwrap();
        assert!(scene.require_channel(SCALE).is_ok());
        assert!(scene.require_channel(EMISSION).is_ok());
        assert!(matches!(
            scene.require_channel("glow"),
            Err(Error::MissingChannel(_))
        ));
        assert!(scene.find_target("OrbEmission/OrbEmissionNode").is_some());
    }

    #[test]
    fn same_frame_write_replaces() {
        let mut scene = Scene::orb_rig(30).unwrap();
        let orb = scene.find_target(ORB_OBJECT).unwrap();
        scene.set_channel_at_frame(SCALE, 1, 0.6).unwrap();
        scene.set_channel_at_frame(SCALE, 1, 0.9).unwrap();
        scene.set_channel_at_frame(SCALE, 3, 1.2).unwrap();
        scene.set_channel_at_frame(SCALE, 2, 1.0).unwrap();

        let keys = scene.keyframes(orb, "scale").unwrap();
        assert_eq!(
            keys,
            &[
                Keyframe::new(1, 0.9),
                Keyframe::new(2, 1.0),
                Keyframe::new(3, 1.2)
            ]
        );
    }

    #[test]
    fn binding_unknown_property_fails() {
        let mut scene = Scene::new(24);
        let node = scene.add_material_input("Mat", "Emit", "Strength", 1.0);
        let err = scene.bind_channel(EMISSION, node, "Color").unwrap_err();
        assert!(matches!(err, Error::MissingProperty { ref property, .. } if property == "Color"));

        // A scene without the emission binding cannot receive emission keys.
        let err = scene.set_channel_at_frame(EMISSION, 1, 8.0).unwrap_err();
        assert!(matches!(err, Error::MissingChannel(_)));
    }

    #[test]
    fn timeline_end_must_follow_start() {
        let mut scene = Scene::new(30);
        assert!(scene.set_timeline_end(0).is_err());
        scene.set_timeline_end(42).unwrap();
        assert_eq!(scene.frame_end(), 42);
    }

    #[test]
    fn commit_animates_the_rig() {
        let analysis = AnalysisResult {
            sample_rate: 44100,
            hop_length: 512,
            frame_length: 2048,
            rms_normalized: vec![0.0, 0.5, 1.0, 0.25],
            beat_frames: vec![],
            duration_seconds: 2048.0 / 44100.0,
        };
        let synthesis = synthesize(&analysis, &SynthesisParams::default()).unwrap();
        let mut scene = Scene::orb_rig(30).unwrap();
        commit(&synthesis, &mut scene, |_| {}).unwrap();

        let orb = scene.find_target(ORB_OBJECT).unwrap();
        let strength = scene.find_target("OrbEmission/OrbEmissionNode").unwrap();
        // Four analysis frames collapse onto render frames 1 and 2.
        let scale = scene.keyframes(orb, "scale").unwrap();
        assert_eq!(scale.len(), 2);
        assert_relative_eq!(scale[0].value, 0.6 + 0.5 * 1.4, epsilon = 1e-6);
        assert_relative_eq!(scale[1].value, 0.6 + 0.25 * 1.4, epsilon = 1e-6);
        assert_eq!(scene.keyframes(strength, EMISSION_STRENGTH).unwrap().len(), 2);
        assert_eq!(scene.frame_end(), 2);
    }

    #[test]
    fn exports_json_for_the_renderer() {
        let mut scene = Scene::orb_rig(30).unwrap();
        scene.set_channel_at_frame(EMISSION, 5, 12.5).unwrap();
        scene.set_timeline_end(5).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scene.json");
        scene.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["fps"], 30);
        assert_eq!(value["frame_start"], 1);
        assert_eq!(value["frame_end"], 5);
        assert_eq!(value["bindings"]["emission"]["property"], "Strength");
        let node = &value["targets"][1];
        assert_eq!(node["kind"], "material_input");
        assert_eq!(node["properties"]["Strength"]["keyframes"][0]["frame"], 5);
        assert_eq!(node["properties"]["Strength"]["keyframes"][0]["value"], 12.5);
    }
}
