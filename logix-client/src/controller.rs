//! Controller facade
//!
//! Owns the per-session caches (symbols by name, types by masked code),
//! resolves symbolic paths both against the wire (instance/element-index
//! form) and against in-memory tags, and drives tag round trips through a
//! shared [`Link`]. Caches live for the controller's lifetime and survive
//! a reconnect; invalidation is an explicit call.

use crate::discovery;
use crate::link::Link;
use crate::symbol::Symbol;
use crate::tag_io::TagTransfer;
use futures::future::BoxFuture;
use logix_core::template::TYPE_CODE_MASK;
use logix_core::{
    ArrayTag, LogixError, LogixResult, PathTarget, Slot, StructureTag, Tag, TagType, TagValue,
    Template,
};
use logix_protocol::epath::split_path_segment;
use logix_protocol::CipConnect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PROBE_PERIOD_SECS: u64 = 60;

fn default_probe_period() -> u64 {
    DEFAULT_PROBE_PERIOD_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Period of the background liveness probe, in seconds.
    #[serde(default = "default_probe_period")]
    pub probe_period_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            probe_period_secs: DEFAULT_PROBE_PERIOD_SECS,
        }
    }
}

pub struct ControllerBuilder {
    connect: Arc<dyn CipConnect>,
    config: ControllerConfig,
}

impl ControllerBuilder {
    pub fn new(connect: Arc<dyn CipConnect>) -> Self {
        Self {
            connect,
            config: ControllerConfig::default(),
        }
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn probe_period(mut self, period: Duration) -> Self {
        self.config.probe_period_secs = period.as_secs();
        self
    }

    pub fn build(self) -> Controller {
        Controller {
            link: Arc::new(Link::new(self.connect)),
            types: seeded_types(),
            symbols: HashMap::new(),
            config: self.config,
        }
    }
}

/// The atomic types every controller understands, keyed by type code.
fn seeded_types() -> HashMap<u16, TagType> {
    let mut types = HashMap::new();
    for bit in 0..8u8 {
        let ty = TagType::bool_bit(bit);
        types.insert(ty.code(), ty);
    }
    for ty in [
        TagType::SINT,
        TagType::INT,
        TagType::DINT,
        TagType::LINT,
        TagType::DWORD,
        TagType::Real,
    ] {
        types.insert(ty.code(), ty);
    }
    types
}

pub struct Controller {
    link: Arc<Link>,
    types: HashMap<u16, TagType>,
    symbols: HashMap<String, Symbol>,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(connect: Arc<dyn CipConnect>) -> Controller {
        ControllerBuilder::new(connect).build()
    }

    pub fn builder(connect: Arc<dyn CipConnect>) -> ControllerBuilder {
        ControllerBuilder::new(connect)
    }

    /// Populate the symbol cache with one full discovery pass if empty.
    async fn ensure_symbols(&mut self) -> LogixResult<()> {
        if !self.symbols.is_empty() {
            return Ok(());
        }
        let records = discovery::list_symbols(&self.link).await?;
        log::info!("discovered {} controller symbols", records.len());
        for record in records {
            let symbol = Symbol::from(record);
            self.symbols.insert(symbol.name().to_string(), symbol);
        }
        Ok(())
    }

    pub async fn symbol(&mut self, name: &str) -> LogixResult<&Symbol> {
        self.ensure_symbols().await?;
        self.symbols
            .get(name)
            .ok_or_else(|| LogixError::UnknownSymbol(name.to_string()))
    }

    /// Resolve a type code to a `TagType`, reading and assembling the
    /// template on a cache miss. Member type codes resolve recursively
    /// through the same cache; type graphs are assumed acyclic.
    pub fn resolve_type(&mut self, code: u16) -> BoxFuture<'_, LogixResult<TagType>> {
        Box::pin(async move {
            let code = code & TYPE_CODE_MASK;
            if let Some(ty) = self.types.get(&code) {
                return Ok(ty.clone());
            }
            log::debug!("reading template for type code 0x{code:04X}");
            let (attributes, definition) = discovery::read_template(&self.link, code).await?;
            let member_codes: Vec<u16> = definition
                .members
                .iter()
                .map(|member| member.type_code())
                .collect();
            let mut member_types = Vec::with_capacity(member_codes.len());
            for member_code in member_codes {
                member_types.push(self.resolve_type(member_code).await?);
            }
            let template = Template::assemble(code, attributes, definition, member_types)?;
            log::debug!("resolved template {}", template.name());
            let ty = TagType::Struct(Arc::new(template));
            self.types.insert(code, ty.clone());
            Ok(ty)
        })
    }

    /// The named symbol with its type resolved: instance id plus type.
    async fn resolved_symbol(&mut self, name: &str) -> LogixResult<(u32, TagType)> {
        self.ensure_symbols().await?;
        let (instance_id, type_code, cached) = {
            let symbol = self
                .symbols
                .get(name)
                .ok_or_else(|| LogixError::UnknownSymbol(name.to_string()))?;
            (symbol.instance_id(), symbol.type_code(), symbol.ty().cloned())
        };
        if let Some(ty) = cached {
            return Ok((instance_id, ty));
        }
        let ty = self.resolve_type(type_code).await?;
        if let Some(symbol) = self.symbols.get_mut(name) {
            symbol.set_type(ty.clone());
        }
        Ok((instance_id, ty))
    }

    /// The tag mirroring the named symbol, materialized but not read.
    /// Useful for setting values ahead of a write.
    pub async fn materialize_tag(&mut self, name: &str) -> LogixResult<&mut Tag> {
        self.resolved_symbol(name).await?;
        let symbol = self
            .symbols
            .get_mut(name)
            .ok_or_else(|| LogixError::UnknownSymbol(name.to_string()))?;
        symbol.ensure_tag()
    }

    /// Read the named tag's full value from the controller.
    pub async fn read_tag(&mut self, name: &str) -> LogixResult<&Tag> {
        self.resolved_symbol(name).await?;
        let link = Arc::clone(&self.link);
        let symbol = self
            .symbols
            .get_mut(name)
            .ok_or_else(|| LogixError::UnknownSymbol(name.to_string()))?;
        let tag = symbol.ensure_tag()?;
        tag.read_from_controller(&link).await?;
        Ok(&*tag)
    }

    /// Write the named tag's current in-memory values to the controller.
    pub async fn write_tag(&mut self, name: &str) -> LogixResult<()> {
        let link = Arc::clone(&self.link);
        let symbol = self
            .symbols
            .get(name)
            .ok_or_else(|| LogixError::UnknownSymbol(name.to_string()))?;
        let tag = symbol.tag().ok_or_else(|| {
            LogixError::Encode(format!("tag {name} holds no in-memory values to write"))
        })?;
        tag.write_to_controller(&link).await
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.symbols.get(name).and_then(Symbol::tag)
    }

    pub fn tag_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.symbols.get_mut(name).and_then(Symbol::tag_mut)
    }

    /// Translate a symbolic path into its wire instance/element-index
    /// form: the leading segment becomes the symbol's instance id, each
    /// member segment becomes its element index (declaration position,
    /// filler members included), and subscripts pass through verbatim.
    pub async fn instance_path_from_symbolic(&mut self, path: &str) -> LogixResult<String> {
        let mut parts = path.split('.');
        let first = parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(|| LogixError::PathResolution(format!("empty tag path {path:?}")))?;
        let (name, indices) = split_path_segment(first)?;
        let (instance_id, mut current) = self.resolved_symbol(name).await?;
        let mut out = instance_id.to_string();
        for index in indices {
            out.push('.');
            out.push_str(&index.to_string());
        }
        for part in parts {
            let (member, indices) = split_path_segment(part)?;
            let template = match &current {
                TagType::Struct(template) => Arc::clone(template),
                other => {
                    return Err(LogixError::PathResolution(format!(
                        "segment {member} of {path} descends into {other}, which has no members"
                    )))
                }
            };
            let element_index = template.element_index_of_member(member)?;
            out.push('.');
            out.push_str(&element_index.to_string());
            current = template.type_of_member(member)?.clone();
            for index in indices {
                out.push('.');
                out.push_str(&index.to_string());
            }
        }
        Ok(out)
    }

    /// Resolve a symbolic path against already-read, in-memory tags.
    pub fn target_at_path(&self, path: &str) -> LogixResult<PathTarget<'_>> {
        let mut parts = path.split('.');
        let first = parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(|| LogixError::PathResolution(format!("empty tag path {path:?}")))?;
        let (name, indices) = split_path_segment(first)?;
        let symbol = self
            .symbols
            .get(name)
            .ok_or_else(|| LogixError::UnknownSymbol(name.to_string()))?;
        let tag = symbol.tag().ok_or_else(|| {
            LogixError::PathResolution(format!("tag {name} has not been read"))
        })?;
        let mut target = match tag {
            Tag::Scalar(tag) => PathTarget::Value(tag.value().ok_or_else(|| {
                LogixError::PathResolution(format!("no value has been read at {name}"))
            })?),
            Tag::Array(tag) => PathTarget::Array(tag),
            Tag::Structure(tag) => PathTarget::Structure(tag),
        };
        target = index_into(target, &indices, path)?;
        for part in parts {
            let (member, indices) = split_path_segment(part)?;
            let structure = target.as_structure().ok_or_else(|| {
                LogixError::PathResolution(format!(
                    "segment {member} of {path} does not address a structure"
                ))
            })?;
            target = slot_target(structure.slot_named(member)?, path)?;
            target = index_into(target, &indices, path)?;
        }
        Ok(target)
    }

    pub fn value_at_path(&self, path: &str) -> LogixResult<&TagValue> {
        self.target_at_path(path)?.as_value().ok_or_else(|| {
            LogixError::TypeMismatch(format!("{path} does not address a leaf value"))
        })
    }

    pub fn structure_at_path(&self, path: &str) -> LogixResult<&StructureTag> {
        self.target_at_path(path)?.as_structure().ok_or_else(|| {
            LogixError::TypeMismatch(format!("{path} does not address a structure"))
        })
    }

    pub fn array_at_path(&self, path: &str) -> LogixResult<&ArrayTag> {
        self.target_at_path(path)?
            .as_array()
            .ok_or_else(|| LogixError::TypeMismatch(format!("{path} does not address an array")))
    }

    /// One liveness probe, retried once transparently.
    pub async fn ping(&self) -> bool {
        self.link.probe().await
    }

    pub fn probe_period(&self) -> Duration {
        Duration::from_secs(self.config.probe_period_secs)
    }

    /// Spawn the periodic background liveness probe. It shares the link
    /// with foreground operations; each probe is one serialized round
    /// trip. Abort the handle to stop it.
    pub fn spawn_probe(&self) -> tokio::task::JoinHandle<()> {
        let link = Arc::clone(&self.link);
        let period = self.probe_period();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the interval's first tick fires immediately
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if !link.probe().await {
                    log::warn!("controller liveness probe failed");
                }
            }
        })
    }

    /// Clear the symbol cache and reset the type cache to the atomic
    /// seed set. Needed after a controller program change; a reconnect
    /// alone keeps the caches.
    pub fn invalidate_caches(&mut self) {
        log::info!("invalidating symbol and type caches");
        self.symbols.clear();
        self.types = seeded_types();
    }

    /// Drop the current session. Caches are kept; the next operation
    /// reconnects.
    pub async fn disconnect(&self) {
        self.link.disconnect().await;
    }

    pub async fn is_connected(&self) -> bool {
        self.link.is_connected().await
    }

    pub async fn close(self) {
        self.link.disconnect().await;
    }
}

fn slot_target<'a>(slot: &'a Slot, path: &str) -> LogixResult<PathTarget<'a>> {
    match slot {
        Slot::Value(value) => Ok(PathTarget::Value(value)),
        Slot::Structure(tag) => Ok(PathTarget::Structure(tag)),
        Slot::Array(tag) => Ok(PathTarget::Array(tag)),
        Slot::Empty => Err(LogixError::PathResolution(format!(
            "no value has been read at {path}"
        ))),
    }
}

fn index_into<'a>(
    mut target: PathTarget<'a>,
    indices: &[u32],
    path: &str,
) -> LogixResult<PathTarget<'a>> {
    for &index in indices {
        let array = target.as_array().ok_or_else(|| {
            LogixError::PathResolution(format!(
                "subscript [{index}] in {path} does not address an array"
            ))
        })?;
        target = slot_target(array.slot(index as usize)?, path)?;
    }
    Ok(target)
}
