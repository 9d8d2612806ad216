use indexmap::IndexMap;

use crate::ast::{Ast, ClassDecl, NodeId, VarDecl};
use crate::diagnostics::CompileResult;
use crate::types::Type;

/// Every property occupies one 8-byte slot.
pub const SLOT_SIZE: i32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSlot {
    pub offset: i32,
    pub ty: Type,
}

/// Memory layout of a class instance: its properties in declaration order.
///
/// Native classes with properties (such as `Event`) are laid out the same
/// way, matching the `#[repr(C)]` structs of the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLayout {
    pub name: String,
    fields: IndexMap<String, FieldSlot>,
    /// Slot of the `[Hashable]` key property, if the class declares one.
    pub key_slot: Option<usize>,
}

impl ClassLayout {
    pub fn compute(ast: &Ast, class: NodeId) -> CompileResult<Self> {
        let decl = ast.get::<ClassDecl>(class)?;
        let mut fields = IndexMap::new();
        for (index, (name, var_decl)) in decl.properties(ast).into_iter().enumerate() {
            let ty = VarDecl::declared_type(ast, var_decl)?;
            fields.insert(name.to_string(), FieldSlot { offset: index as i32 * SLOT_SIZE, ty });
        }
        let key_slot = decl.hashable_key(ast).and_then(|key| fields.get_index_of(key));
        Ok(Self { name: decl.name.clone(), fields, key_slot })
    }

    pub fn field(&self, name: &str) -> Option<&FieldSlot> {
        self.fields.get(name)
    }

    /// Index of property `name` when an instance is viewed as a slice of `i64` slots.
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    pub fn slot_count(&self) -> usize {
        self.fields.len()
    }

    pub fn size(&self) -> u32 {
        self.fields.len() as u32 * SLOT_SIZE as u32
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSlot)> {
        self.fields.iter().map(|(name, slot)| (name.as_str(), slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;
    use crate::parser::parse_program;

    #[test]
    fn fields_are_consecutive_slots() {
        let src = "[Hashable(\"id\")]\nclass Result {\n  public Int count;\n  public Int id;\n  public Float ratio;\n}";
        let (ast, root) = parse_program(src).unwrap();
        let class = ast.get::<Program>(root).unwrap().classes[0];
        let layout = ClassLayout::compute(&ast, class).unwrap();
        assert_eq!(layout.size(), 24);
        assert_eq!(layout.field("id").unwrap().offset, 8);
        assert_eq!(layout.field("ratio").unwrap().ty, Type::float());
        assert_eq!(layout.key_slot, Some(1));
        assert_eq!(layout.slot_index("count"), Some(0));
    }

    #[test]
    fn class_without_properties_is_empty() {
        let (ast, root) = parse_program("class Empty {\n}").unwrap();
        let class = ast.get::<Program>(root).unwrap().classes[0];
        let layout = ClassLayout::compute(&ast, class).unwrap();
        assert_eq!(layout.size(), 0);
        assert_eq!(layout.key_slot, None);
    }
}
