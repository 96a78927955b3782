//! Product factory
//!
//! Lanes never build products themselves; they ask a [`ProductFactory`]
//! and hand the product back when its exit sequence is done.

use rand::Rng;
use rand::rngs::StdRng;

use ff_core::{ProductId, ProductTypeId, SpawnError};

use crate::catalog::ProductCatalog;
use crate::config::ProductConfig;
use crate::product::Product;

/// Source of product instances
pub trait ProductFactory: Send {
    /// False when the factory cannot produce anything at all
    fn is_ready(&self) -> bool;

    /// Build (or recycle) a product of the given type
    fn acquire(
        &mut self,
        type_id: ProductTypeId,
        is_defective: bool,
        rng: &mut StdRng,
    ) -> Result<Product, SpawnError>;

    /// Return a product once its lane is done with it
    fn release(&mut self, product: Product);
}

/// Bounded pool of recycled product shells
///
/// Ids stay unique across recycling: every acquire hands out a fresh id.
#[derive(Debug)]
pub struct PooledFactory {
    catalog: ProductCatalog,
    config: ProductConfig,
    free: Vec<Product>,
    live: usize,
    next_id: u64,
    ready: bool,
}

impl PooledFactory {
    pub fn new(catalog: ProductCatalog, config: ProductConfig) -> Self {
        let ready = !catalog.is_empty() && config.pool_capacity > 0;
        if !ready {
            log::warn!("Product factory has nothing to build, spawning disabled");
        }
        Self {
            catalog,
            config,
            free: Vec::new(),
            live: 0,
            next_id: 1,
            ready,
        }
    }

    /// Force the factory offline (or back online)
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Products currently out on lanes
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Recycled shells waiting for reuse
    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Number of defects to roll: in `[min, max]`, clamped to the pool size
    fn defect_count(&self, pool_size: usize, rng: &mut StdRng) -> usize {
        let hi = self.config.max_defects.min(pool_size);
        let lo = self.config.min_defects.min(hi);
        rng.random_range(lo..=hi)
    }
}

impl ProductFactory for PooledFactory {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn acquire(
        &mut self,
        type_id: ProductTypeId,
        is_defective: bool,
        rng: &mut StdRng,
    ) -> Result<Product, SpawnError> {
        if !self.ready {
            return Err(SpawnError::FactoryUnavailable);
        }
        if self.live >= self.config.pool_capacity {
            return Err(SpawnError::PoolExhausted);
        }
        let ty = self
            .catalog
            .product_type(type_id)
            .ok_or(SpawnError::UnknownProductType(type_id))?;

        // Defective units are rejected, never fixed, so they roll nothing
        let defects = if is_defective {
            Vec::new()
        } else {
            let mut pool = ty.defects.clone();
            let count = self.defect_count(pool.len(), rng);
            for i in 0..count {
                let j = rng.random_range(i..pool.len());
                pool.swap(i, j);
            }
            pool.truncate(count);
            pool
        };

        let id = ProductId::new(self.next_id);
        self.next_id += 1;

        let product = match self.free.pop() {
            Some(mut shell) => {
                shell.id = id;
                shell.type_id = ty.id;
                shell.name.clone_from(&ty.name);
                shell.is_defective = is_defective;
                shell.active_defects = defects.into_iter().collect();
                shell.damage_timer.reset(self.config.damage_timer);
                shell
            }
            None => Product::new(
                id,
                ty.id,
                ty.name.clone(),
                is_defective,
                defects,
                self.config.damage_timer,
            ),
        };

        self.live += 1;
        Ok(product)
    }

    fn release(&mut self, mut product: Product) {
        self.live = self.live.saturating_sub(1);
        product.reset_for_pool();
        if self.free.len() < self.config.pool_capacity {
            self.free.push(product);
        }
    }
}
