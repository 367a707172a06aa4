use crate::{Error, ResourceType, Result, TextureDesc};

/// Texture slot, relative to the denoiser that declared it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolSlot {
    Permanent(u16),
    Transient(u16),
}

/// Permanent and transient texture pools shared by all denoisers of an
/// instance.
///
/// Permanent textures carry history from frame to frame, so each denoiser
/// gets its own range, biased by the number of permanent textures declared
/// by the denoisers before it. Transient textures live only within one
/// denoiser's dispatches, so they are aliased: a denoiser reuses any
/// identical texture it hasn't claimed yet before growing the pool.
#[derive(Clone, Debug, Default)]
pub struct ResourcePools {
    permanent: Vec<TextureDesc>,
    transient: Vec<TextureDesc>,
}

impl ResourcePools {
    pub fn permanent(&self) -> &[TextureDesc] {
        &self.permanent
    }

    pub fn transient(&self) -> &[TextureDesc] {
        &self.transient
    }

    /// Opens a new scope for the next denoiser's declarations.
    pub fn scope(&self) -> PoolScope {
        PoolScope {
            permanent_base: self.permanent.len(),
            permanent_len: 0,
            transient: Default::default(),
        }
    }

    pub fn add_to_permanent_pool(
        &mut self,
        scope: &mut PoolScope,
        desc: TextureDesc,
    ) -> Result<PoolSlot> {
        if self.permanent.len() >= usize::from(u16::MAX) {
            return Err(Error::PoolOverflow("permanent"));
        }

        debug_assert_eq!(
            scope.permanent_base + scope.permanent_len,
            self.permanent.len()
        );

        self.permanent.push(desc);

        let slot = PoolSlot::Permanent(scope.permanent_len as u16);

        scope.permanent_len += 1;

        Ok(slot)
    }

    pub fn add_to_transient_pool(
        &mut self,
        scope: &mut PoolScope,
        desc: TextureDesc,
    ) -> Result<PoolSlot> {
        let aliased = self
            .transient
            .iter()
            .enumerate()
            .position(|(idx, candidate)| {
                *candidate == desc && !scope.transient.contains(&(idx as u16))
            });

        let idx = if let Some(idx) = aliased {
            idx
        } else {
            if self.transient.len() >= usize::from(u16::MAX) {
                return Err(Error::PoolOverflow("transient"));
            }

            self.transient.push(desc);
            self.transient.len() - 1
        };

        let slot = PoolSlot::Transient(scope.transient.len() as u16);

        scope.transient.push(idx as u16);

        Ok(slot)
    }

    pub fn desc(
        &self,
        scope: &PoolScope,
        slot: PoolSlot,
    ) -> Option<TextureDesc> {
        let (ty, idx) = scope.resolve(slot).ok()?;

        let pool = match ty {
            ResourceType::PermanentPool => &self.permanent,
            _ => &self.transient,
        };

        pool.get(usize::from(idx)).copied()
    }
}

/// Maps one denoiser's pool slots into global pool indices.
#[derive(Clone, Debug, Default)]
pub struct PoolScope {
    permanent_base: usize,
    permanent_len: usize,
    transient: Vec<u16>,
}

impl PoolScope {
    pub fn resolve(&self, slot: PoolSlot) -> Result<(ResourceType, u16)> {
        match slot {
            PoolSlot::Permanent(idx)
                if usize::from(idx) < self.permanent_len =>
            {
                Ok((
                    ResourceType::PermanentPool,
                    (self.permanent_base + usize::from(idx)) as u16,
                ))
            }

            PoolSlot::Transient(idx) => self
                .transient
                .get(usize::from(idx))
                .map(|&idx| (ResourceType::TransientPool, idx))
                .ok_or(Error::InvalidArgument("unknown transient pool slot")),

            PoolSlot::Permanent(_) => {
                Err(Error::InvalidArgument("unknown permanent pool slot"))
            }
        }
    }

    pub fn permanent_slots(&self) -> impl Iterator<Item = PoolSlot> {
        (0..self.permanent_len).map(|idx| PoolSlot::Permanent(idx as u16))
    }
}
