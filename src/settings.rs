//! Settings persistence: the blob model and the bridge to the caller's
//! save/load hooks.
//!
//! The blob is JSON. Parsing is lenient: entries that fail to parse are
//! skipped so a blob written by a newer version still loads.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{
    BeginSaveSessionHook, Config, EndSaveSessionHook, LoadNodeSettingsHook, LoadSettingsHook,
    SaveNodeSettingsHook, SaveSettingsHook,
};
use crate::error::SettingsError;
use crate::geometry::Vec2;

bitflags! {
    /// Which class of persisted attribute changed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SaveReasonFlags: u32 {
        const NAVIGATION = 0b0_0001;
        const POSITION   = 0b0_0010;
        const SIZE       = 0b0_0100;
        const SELECTION  = 0b0_1000;
        const USER       = 0b1_0000;
    }
}

/// Persisted state of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSettings {
    pub location: [f32; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[f32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<[f32; 2]>,
}

impl NodeSettings {
    pub fn location(&self) -> Vec2 {
        Vec2::new(self.location[0], self.location[1])
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SettingsError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SettingsError> {
        if bytes.is_empty() {
            return Err(SettingsError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Persisted view state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub pan: [f32; 2],
    pub zoom: f32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self { pan: [0.0, 0.0], zoom: 1.0 }
    }
}

/// The whole settings blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Keyed by the node id's canonical string.
    pub nodes: BTreeMap<String, NodeSettings>,
    pub view: ViewSettings,
    /// Entries of the form `node:<id>` or `link:<id>`.
    pub selection: Vec<String>,
}

impl EditorSettings {
    pub fn to_json(&self) -> Result<Vec<u8>, SettingsError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a blob, skipping entries that do not parse.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SettingsError> {
        if bytes.is_empty() {
            return Err(SettingsError::Empty);
        }
        let value: Value = serde_json::from_slice(bytes)?;
        let mut settings = EditorSettings::default();

        if let Some(nodes) = value.get("nodes").and_then(Value::as_object) {
            for (key, entry) in nodes {
                match NodeSettings::deserialize(entry) {
                    Ok(node) => {
                        settings.nodes.insert(key.clone(), node);
                    }
                    Err(err) => debug!(node = %key, %err, "skipping node settings entry"),
                }
            }
        }

        if let Some(view) = value.get("view") {
            match ViewSettings::deserialize(view) {
                Ok(view) if view.zoom.is_finite() && view.zoom > 0.0 => settings.view = view,
                Ok(_) => debug!("ignoring view settings with invalid zoom"),
                Err(err) => debug!(%err, "ignoring view settings"),
            }
        }

        if let Some(selection) = value.get("selection").and_then(Value::as_array) {
            settings.selection = selection
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
        }

        Ok(settings)
    }
}

/// Calls the configured persistence hooks. A hook left unset disables that
/// channel; failures are logged and never retried within the frame.
#[derive(Default)]
pub struct SettingsBridge {
    begin_session: Option<BeginSaveSessionHook>,
    end_session: Option<EndSaveSessionHook>,
    save: Option<SaveSettingsHook>,
    load: Option<LoadSettingsHook>,
    save_node: Option<SaveNodeSettingsHook>,
    load_node: Option<LoadNodeSettingsHook>,
}

impl SettingsBridge {
    /// Take the hooks out of `config`. With a settings file configured and no
    /// whole-blob hooks, file-backed hooks are installed.
    pub fn from_config(config: &mut Config) -> Self {
        let mut bridge = SettingsBridge {
            begin_session: config.begin_save_session.take(),
            end_session: config.end_save_session.take(),
            save: config.save_settings.take(),
            load: config.load_settings.take(),
            save_node: config.save_node_settings.take(),
            load_node: config.load_node_settings.take(),
        };
        if let Some(path) = config.settings_file.clone() {
            if bridge.save.is_none() {
                bridge.save = Some(file_save_hook(path.clone()));
            }
            if bridge.load.is_none() {
                bridge.load = Some(file_load_hook(path));
            }
        }
        bridge
    }

    pub fn can_save(&self) -> bool {
        self.save.is_some() || self.save_node.is_some()
    }

    /// Request the whole blob once. `None` when no hook is set, the hook has
    /// nothing, or the blob does not parse.
    pub fn load(&mut self) -> Option<EditorSettings> {
        let load = self.load.as_mut()?;
        let bytes = load()?;
        match EditorSettings::from_slice(&bytes) {
            Ok(settings) => {
                debug!(nodes = settings.nodes.len(), "settings loaded");
                Some(settings)
            }
            Err(SettingsError::Empty) => None,
            Err(err) => {
                warn!(%err, "failed to parse editor settings, using defaults");
                None
            }
        }
    }

    /// Per-node lookup for nodes the blob did not know about.
    pub fn load_node(&mut self, key: &str) -> Option<NodeSettings> {
        let load = self.load_node.as_mut()?;
        let bytes = load(key)?;
        match NodeSettings::from_slice(&bytes) {
            Ok(node) => Some(node),
            Err(SettingsError::Empty) => None,
            Err(err) => {
                warn!(node = key, %err, "failed to parse node settings");
                None
            }
        }
    }

    /// Run one save session. Returns false if any hook reported failure.
    pub fn save(
        &mut self,
        settings: &EditorSettings,
        reasons: SaveReasonFlags,
        dirty_nodes: &[(String, SaveReasonFlags)],
    ) -> bool {
        if !self.can_save() {
            return true;
        }
        if let Some(begin) = self.begin_session.as_mut() {
            begin();
        }

        let mut ok = true;
        if let Some(save) = self.save.as_mut() {
            match settings.to_json() {
                Ok(bytes) => {
                    if !save(&bytes, reasons) {
                        warn!(?reasons, "save_settings hook reported failure");
                        ok = false;
                    }
                }
                Err(err) => {
                    warn!(%err, "failed to serialize editor settings");
                    ok = false;
                }
            }
        }

        if let Some(save_node) = self.save_node.as_mut() {
            for (key, node_reasons) in dirty_nodes {
                let Some(node) = settings.nodes.get(key) else {
                    continue;
                };
                let saved = node
                    .to_json()
                    .map(|bytes| save_node(key.as_str(), &bytes, *node_reasons))
                    .unwrap_or(false);
                if !saved {
                    warn!(node = %key, "save_node_settings hook reported failure");
                    ok = false;
                }
            }
        }

        if let Some(end) = self.end_session.as_mut() {
            end();
        }
        debug!(?reasons, ok, "settings saved");
        ok
    }
}

fn file_load_hook(path: PathBuf) -> LoadSettingsHook {
    Box::new(move || match std::fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            warn!(path = %path.display(), err = %SettingsError::from(err), "cannot read settings file");
            None
        }
    })
}

fn file_save_hook(path: PathBuf) -> SaveSettingsHook {
    Box::new(move |bytes, _reasons| match std::fs::write(&path, bytes) {
        Ok(()) => true,
        Err(err) => {
            warn!(path = %path.display(), err = %SettingsError::from(err), "cannot write settings file");
            false
        }
    })
}
