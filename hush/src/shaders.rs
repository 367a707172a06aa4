use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use fxhash::FxHashMap;

/// Preprocessor define a shader permutation was compiled with.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Define {
    pub name: Cow<'static, str>,
    pub value: Cow<'static, str>,
}

impl Define {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn flag(name: &'static str, enabled: bool) -> Self {
        Self::new(name, if enabled { "1" } else { "0" })
    }
}

/// Shader's name together with the defines of one of its permutations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub name: Cow<'static, str>,
    pub defines: Vec<Define>,
}

impl ShaderKey {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        defines: Vec<Define>,
    ) -> Self {
        Self {
            name: name.into(),
            defines,
        }
    }

    /// Returns a textual identifier of this permutation, e.g.
    /// `REBLUR_PrePass REBLUR_DIFFUSE=1 AFTER_HIT_DIST_RECONSTRUCTION=0`.
    ///
    /// Defines are listed in declaration order, so two keys with the same
    /// defines declared in different order get different identifiers; see
    /// [`Self::canonicalize()`] for an order-independent form.
    pub fn identifier(&self) -> String {
        self.to_string()
    }

    /// Sorts defines by name, so that keys describing the same permutation
    /// compare equal regardless of declaration order.
    pub fn canonicalize(mut self) -> Self {
        self.defines.sort();
        self
    }
}

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;

        for define in &self.defines {
            write!(f, " {}={}", define.name, define.value)?;
        }

        Ok(())
    }
}

/// Binary target format of a compiled shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderFormat {
    Dxbc,
    Dxil,
    Spirv,
}

impl ShaderFormat {
    pub const ALL: [Self; 3] = [Self::Dxbc, Self::Dxil, Self::Spirv];
}

/// Source of precompiled shader permutations.
pub trait ShaderStore {
    /// Returns the bytecode of permutation whose defines match `defines`
    /// exactly (in any order), or `None` if it hasn't been compiled for
    /// given format.
    fn find_permutation(
        &self,
        format: ShaderFormat,
        name: &str,
        defines: &[Define],
    ) -> Option<Arc<[u8]>>;
}

/// Bytecode of one permutation, for every target format; formats that
/// weren't compiled are represented by empty bytecode.
#[derive(Clone, PartialEq, Eq)]
pub struct ShaderBytecode {
    pub dxbc: Arc<[u8]>,
    pub dxil: Arc<[u8]>,
    pub spirv: Arc<[u8]>,
}

impl ShaderBytecode {
    pub fn empty() -> Self {
        let empty: Arc<[u8]> = Arc::from(Vec::new());

        Self {
            dxbc: empty.clone(),
            dxil: empty.clone(),
            spirv: empty,
        }
    }

    pub fn resolve(store: &dyn ShaderStore, key: &ShaderKey) -> Self {
        let mut this = Self::empty();
        let mut found = false;

        for format in ShaderFormat::ALL {
            let bytecode =
                store.find_permutation(format, &key.name, &key.defines);

            if let Some(bytecode) = bytecode {
                *this.get_mut(format) = bytecode;
                found = true;
            } else {
                log::debug!(
                    "Shader `{}` is not available as {:?}",
                    key,
                    format
                );
            }
        }

        if !found {
            log::warn!(
                "Shader `{}` is not available in any format; its dispatches \
                 will carry empty bytecode",
                key
            );
        }

        this
    }

    pub fn get(&self, format: ShaderFormat) -> &[u8] {
        match format {
            ShaderFormat::Dxbc => &self.dxbc,
            ShaderFormat::Dxil => &self.dxil,
            ShaderFormat::Spirv => &self.spirv,
        }
    }

    fn get_mut(&mut self, format: ShaderFormat) -> &mut Arc<[u8]> {
        match format {
            ShaderFormat::Dxbc => &mut self.dxbc,
            ShaderFormat::Dxil => &mut self.dxil,
            ShaderFormat::Spirv => &mut self.spirv,
        }
    }

    pub fn is_empty(&self) -> bool {
        ShaderFormat::ALL
            .into_iter()
            .all(|format| self.get(format).is_empty())
    }
}

impl fmt::Debug for ShaderBytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderBytecode")
            .field("dxbc", &self.dxbc.len())
            .field("dxil", &self.dxil.len())
            .field("spirv", &self.spirv.len())
            .finish()
    }
}

/// In-memory [`ShaderStore`].
#[derive(Clone, Debug, Default)]
pub struct ShaderLibrary {
    permutations: FxHashMap<(ShaderFormat, ShaderKey), Arc<[u8]>>,
}

impl ShaderLibrary {
    pub fn insert(
        &mut self,
        format: ShaderFormat,
        key: ShaderKey,
        bytecode: impl Into<Arc<[u8]>>,
    ) {
        self.permutations
            .insert((format, key.canonicalize()), bytecode.into());
    }

    pub fn len(&self) -> usize {
        self.permutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permutations.is_empty()
    }
}

impl ShaderStore for ShaderLibrary {
    fn find_permutation(
        &self,
        format: ShaderFormat,
        name: &str,
        defines: &[Define],
    ) -> Option<Arc<[u8]>> {
        let key = ShaderKey::new(name.to_owned(), defines.to_vec());

        self.permutations
            .get(&(format, key.canonicalize()))
            .cloned()
    }
}
