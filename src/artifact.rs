//! The compiled form of a query and the host-side calling convention.

use cranelift_jit::JITModule;
use indexmap::IndexMap;
use thiserror::Error;

use crate::codegen::ClassLayout;
use crate::runtime::{AggregateMap, EventPath};
use crate::types::{self, Type};

/// Queries take at most this many arguments.
pub const MAX_PARAMS: usize = 4;

/// A host value passed to a compiled query, matched against its declared parameters.
pub enum Arg<'a> {
    Int(i64),
    Path(&'a mut EventPath),
    Map(&'a mut AggregateMap),
}

impl Arg<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Arg::Int(_) => types::INT,
            Arg::Path(_) => "Path",
            Arg::Map(_) => "Map",
        }
    }

    fn matches(&self, ty: &Type) -> bool {
        self.kind() == ty.name
    }

    fn raw(&mut self) -> i64 {
        match self {
            Arg::Int(value) => *value,
            Arg::Path(path) => &mut **path as *mut EventPath as i64,
            Arg::Map(map) => &mut **map as *mut AggregateMap as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Output {
    Void,
    Int(i64),
    Float(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("query takes {expected} arguments but {found} were supplied")]
    Arity { expected: usize, found: usize },
    #[error("argument {index} ('{name}') expects {expected}, found {found}")]
    Mismatch { index: usize, name: String, expected: Type, found: &'static str },
    #[error("parameter '{name}' of type {ty} cannot be supplied by the host")]
    UnsupportedParameter { name: String, ty: Type },
    #[error("queries returning {0} cannot be invoked")]
    UnsupportedReturn(Type),
    #[error("queries take at most {MAX_PARAMS} arguments, this one declares {0}")]
    TooManyParameters(usize),
}

/// Native code for one query, ready to run against host data.
///
/// Owns the JIT memory holding the code; it is released on drop.
pub struct CompiledQuery {
    jit: Option<JITModule>,
    entry: *const u8,
    params: Vec<(String, Type)>,
    return_type: Type,
    layouts: IndexMap<String, ClassLayout>,
    instantiations: Vec<Type>,
}

macro_rules! call_entry {
    ($entry:expr, $ret:ty, $args:expr) => {{
        let a = $args;
        // SAFETY: the entry point was compiled with exactly this signature.
        unsafe {
            match a.len() {
                0 => std::mem::transmute::<*const u8, extern "C" fn() -> $ret>($entry)(),
                1 => std::mem::transmute::<*const u8, extern "C" fn(i64) -> $ret>($entry)(a[0]),
                2 => std::mem::transmute::<*const u8, extern "C" fn(i64, i64) -> $ret>($entry)(a[0], a[1]),
                3 => std::mem::transmute::<*const u8, extern "C" fn(i64, i64, i64) -> $ret>($entry)(a[0], a[1], a[2]),
                _ => std::mem::transmute::<*const u8, extern "C" fn(i64, i64, i64, i64) -> $ret>($entry)(
                    a[0], a[1], a[2], a[3],
                ),
            }
        }
    }};
}

impl CompiledQuery {
    pub(crate) fn new(
        jit: JITModule,
        entry: *const u8,
        params: Vec<(String, Type)>,
        return_type: Type,
        layouts: IndexMap<String, ClassLayout>,
        instantiations: Vec<Type>,
    ) -> Self {
        Self { jit: Some(jit), entry, params, return_type, layouts, instantiations }
    }

    pub fn params(&self) -> &[(String, Type)] {
        &self.params
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// Layout of class `name`, to read aggregation map entries by property name.
    pub fn layout(&self, name: &str) -> Option<&ClassLayout> {
        self.layouts.get(name)
    }

    /// Distinct `Map` instantiations the query uses.
    pub fn instantiations(&self) -> &[Type] {
        &self.instantiations
    }

    /// Run the query. Arguments are checked against the declared parameters first.
    #[tracing::instrument(level = "debug", skip_all, fields(args = args.len()))]
    pub fn invoke(&self, args: &mut [Arg<'_>]) -> Result<Output, InvokeError> {
        if self.params.len() > MAX_PARAMS {
            return Err(InvokeError::TooManyParameters(self.params.len()));
        }
        if args.len() != self.params.len() {
            return Err(InvokeError::Arity { expected: self.params.len(), found: args.len() });
        }
        let mut raw = Vec::with_capacity(args.len());
        for (index, (arg, (name, ty))) in args.iter_mut().zip(&self.params).enumerate() {
            if !matches!(ty.name.as_str(), types::INT | "Path" | "Map") {
                return Err(InvokeError::UnsupportedParameter { name: name.clone(), ty: ty.clone() });
            }
            if !arg.matches(ty) {
                return Err(InvokeError::Mismatch {
                    index,
                    name: name.clone(),
                    expected: ty.clone(),
                    found: arg.kind(),
                });
            }
            raw.push(arg.raw());
        }

        let output = match self.return_type.name.as_str() {
            types::VOID => {
                call_entry!(self.entry, (), &raw);
                Output::Void
            }
            types::INT => Output::Int(call_entry!(self.entry, i64, &raw)),
            types::FLOAT => Output::Float(call_entry!(self.entry, f64, &raw)),
            types::BOOLEAN => Output::Boolean(call_entry!(self.entry, i8, &raw) != 0),
            _ => return Err(InvokeError::UnsupportedReturn(self.return_type.clone())),
        };
        tracing::debug!(?output, "query finished");
        Ok(output)
    }
}

impl Drop for CompiledQuery {
    fn drop(&mut self) {
        if let Some(jit) = self.jit.take() {
            // SAFETY: `entry` is private and dies with `self`.
            unsafe { jit.free_memory() };
        }
    }
}
