use std::collections::{HashMap, HashSet};

use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::id::{IdAllocator, LayerId};
use crate::layer::{Layer, LayerSpec};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Layer id already in use. id: {0}")]
    DuplicateId(LayerId),
    #[error("Unknown layer. id: {0}")]
    NotFound(LayerId),
    #[error("Invalid layer order. missing: {missing:?}, duplicated: {duplicated:?}, unknown: {unknown:?}")]
    InvalidPermutation {
        missing: Vec<LayerId>,
        duplicated: Vec<LayerId>,
        unknown: Vec<LayerId>,
    },
    #[error("Opacity out of range, expected 0.0..=1.0. value: {0}")]
    OpacityOutOfRange(f32),
}

/// Authoritative state of which layers exist and in what order they are drawn.
///
/// `H` is the surface's drawable handle, held alongside but separately from the layer records.
/// The draw order runs bottom to top, the last entry paints last and so appears on top.
#[derive(Debug)]
pub struct LayerRegistry<H> {
    allocator: IdAllocator,
    layers: HashMap<LayerId, Layer>,
    handles: HashMap<LayerId, H>,
    draw_order: Vec<LayerId>,
    retired: HashSet<LayerId>,
}

impl<H> Default for LayerRegistry<H> {
    fn default() -> Self {
        Self {
            allocator: IdAllocator::default(),
            layers: HashMap::new(),
            handles: HashMap::new(),
            draw_order: Vec::new(),
            retired: HashSet::new(),
        }
    }
}

impl<H> LayerRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the id and applies defaults without registering anything. An id is only taken
    /// from the allocator when the spec is accepted.
    ///
    /// Split from [`LayerRegistry::insert`] so that a rejected layer never reaches the surface.
    /// Every prepared layer must be inserted.
    pub(crate) fn prepare(&mut self, spec: LayerSpec) -> Result<Layer, RegistryError> {
        self.prepare_claiming(spec, &HashSet::new())
    }

    /// Prepares a batch as if each spec were added in turn, or none of them.
    ///
    /// On error the allocator is rolled back, so no id is consumed.
    pub(crate) fn prepare_all(&mut self, specs: Vec<LayerSpec>) -> Result<Vec<Layer>, RegistryError> {
        let allocator = self.allocator.clone();
        let mut claimed = HashSet::with_capacity(specs.len());
        let mut layers = Vec::with_capacity(specs.len());

        for spec in specs {
            match self.prepare_claiming(spec, &claimed) {
                Ok(layer) => {
                    claimed.insert(layer.id().clone());
                    layers.push(layer);
                }
                Err(e) => {
                    self.allocator = allocator;
                    return Err(e);
                }
            }
        }
        Ok(layers)
    }

    /// `claimed` holds ids of prepared layers not inserted yet.
    fn prepare_claiming(&mut self, spec: LayerSpec, claimed: &HashSet<LayerId>) -> Result<Layer, RegistryError> {
        check_opacity(spec.opacity)?;

        let id = match spec.id.clone() {
            Some(id) => {
                if self.is_taken(&id) || claimed.contains(&id) {
                    warn!("Rejecting layer with duplicate id. id: {}", id);
                    return Err(RegistryError::DuplicateId(id));
                }
                id
            }
            None => self.allocate_id(claimed),
        };

        Ok(Layer::from_spec(id, spec))
    }

    fn is_taken(&self, id: &LayerId) -> bool {
        self.layers.contains_key(id) || self.retired.contains(id)
    }

    fn allocate_id(&mut self, claimed: &HashSet<LayerId>) -> LayerId {
        // explicit ids may have claimed a counter value already, skip past them
        loop {
            let id = self.allocator.next_id();
            if !self.is_taken(&id) && !claimed.contains(&id) {
                return id;
            }
            trace!("Allocated id already claimed explicitly. id: {}", id);
        }
    }

    /// Registers a prepared layer and its drawable handle at the top of the draw order.
    pub(crate) fn insert(&mut self, layer: Layer, handle: H) -> Result<&Layer, RegistryError> {
        let id = layer.id().clone();
        if self.is_taken(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        info!("Adding layer. id: {}, title: '{}'", id, layer.title());
        self.draw_order.push(id.clone());
        self.handles.insert(id.clone(), handle);
        Ok(self.layers.entry(id).or_insert(layer))
    }

    /// Validates the spec, assigns the id and registers the layer with the handle built by
    /// `make_handle`. A rejected spec never reaches `make_handle`.
    pub fn add(&mut self, spec: LayerSpec, make_handle: impl FnOnce(&Layer) -> H) -> Result<LayerId, RegistryError> {
        let layer = self.prepare(spec)?;
        let handle = make_handle(&layer);
        let id = layer.id().clone();
        self.insert(layer, handle)?;
        Ok(id)
    }

    pub fn get(&self, id: &LayerId) -> Result<&Layer, RegistryError> {
        self.layers
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    pub(crate) fn get_mut(&mut self, id: &LayerId) -> Result<&mut Layer, RegistryError> {
        self.layers
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    pub fn handle(&self, id: &LayerId) -> Result<&H, RegistryError> {
        self.handles
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.layers.contains_key(id)
    }

    /// Removes the record, the handle association and the draw order entry together.
    ///
    /// The id is retired and will never be issued or accepted again.
    pub fn remove(&mut self, id: &LayerId) -> Result<(Layer, H), RegistryError> {
        if !self.layers.contains_key(id) {
            return Err(RegistryError::NotFound(id.clone()));
        }

        let layer = self
            .layers
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        let handle = self
            .handles
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        self.draw_order
            .retain(|entry| entry != id);
        self.retired.insert(id.clone());

        info!("Removed layer. id: {}, title: '{}'", id, layer.title());
        Ok((layer, handle))
    }

    /// Replaces the draw order (bottom to top). `ids` must be a permutation of the registered ids.
    pub fn reorder(&mut self, ids: Vec<LayerId>) -> Result<(), RegistryError> {
        self.check_permutation(&ids)?;
        debug!("Reordering layers. draw_order: {:?}", ids);
        self.draw_order = ids;
        Ok(())
    }

    fn check_permutation(&self, ids: &[LayerId]) -> Result<(), RegistryError> {
        let mut seen = HashSet::with_capacity(ids.len());
        let mut duplicated = vec![];
        let mut unknown = vec![];

        for id in ids {
            if !self.layers.contains_key(id) {
                unknown.push(id.clone());
            } else if !seen.insert(id) {
                duplicated.push(id.clone());
            }
        }

        let mut missing = self
            .draw_order
            .iter()
            .filter(|id| !seen.contains(id))
            .cloned()
            .collect::<Vec<_>>();
        missing.sort();

        if missing.is_empty() && duplicated.is_empty() && unknown.is_empty() {
            return Ok(());
        }

        warn!(
            "Rejecting layer order. missing: {:?}, duplicated: {:?}, unknown: {:?}",
            missing, duplicated, unknown
        );
        Err(RegistryError::InvalidPermutation {
            missing,
            duplicated,
            unknown,
        })
    }

    /// Bottom to top.
    pub fn draw_order(&self) -> &[LayerId] {
        &self.draw_order
    }

    /// Handles in draw order, bottom to top.
    pub fn handles_in_draw_order(&self) -> impl Iterator<Item = &H> {
        self.draw_order
            .iter()
            .filter_map(|id| self.handles.get(id))
    }

    /// Layers in draw order, bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.draw_order
            .iter()
            .filter_map(|id| self.layers.get(id))
    }

    pub fn zoom_gated(&self) -> impl Iterator<Item = (&Layer, &H)> {
        self.iter()
            .filter(|layer| layer.is_zoom_gated())
            .filter_map(|layer| {
                self.handles
                    .get(layer.id())
                    .map(|handle| (layer, handle))
            })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn ids_issued(&self) -> u64 {
        self.allocator.issued()
    }
}

pub(crate) fn check_opacity(value: f32) -> Result<(), RegistryError> {
    match (0.0..=1.0).contains(&value) {
        true => Ok(()),
        false => Err(RegistryError::OpacityOutOfRange(value)),
    }
}
