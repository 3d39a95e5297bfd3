//! Linked-program input consumed by the emitter.
//!
//! The linker hands the emitter a [`LinkingUnit`]: the reachable classes of
//! the program with their members already resolved. Everything here is read
//! only; the emitter never mutates the unit.

pub mod definitions;
pub mod trees;

pub use trees::{BinOp, Expr, Literal, Type, UnOp};

/// A fully linked program, ready for emission.
#[derive(Debug, Clone, Default)]
pub struct LinkingUnit {
    pub classes: Vec<LinkedClass>,
}

impl LinkingUnit {
    pub fn new(classes: Vec<LinkedClass>) -> Self {
        LinkingUnit { classes }
    }
}

/// The kind of a linked class, driving which pieces get emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    ModuleClass,
    JSClass,
    JSModuleClass,
    Interface,
    RawJSType,
    HijackedClass,
}

impl ClassKind {
    /// Classes defined in the compiled program itself (as opposed to raw JS
    /// types and hijacked primitives), which get constructors and methods.
    pub fn is_any_scalajs_defined_class(self) -> bool {
        matches!(
            self,
            ClassKind::Class | ClassKind::ModuleClass | ClassKind::JSClass | ClassKind::JSModuleClass
        )
    }

    /// Scala classes with a prototype the emitter owns.
    pub fn is_class(self) -> bool {
        matches!(self, ClassKind::Class | ClassKind::ModuleClass)
    }

    /// Classes defined as JS classes (constructor comes from the exported
    /// `"constructor"` member).
    pub fn is_js_class(self) -> bool {
        matches!(self, ClassKind::JSClass | ClassKind::JSModuleClass)
    }

    pub fn has_module_accessor(self) -> bool {
        matches!(self, ClassKind::ModuleClass | ClassKind::JSModuleClass)
    }
}

/// One linked class definition.
#[derive(Debug, Clone)]
pub struct LinkedClass {
    /// ASCII mangled identifier, unique in the unit.
    pub encoded_name: String,
    /// Display name for messages and runtime class-name strings.
    pub original_name: Option<String>,
    pub kind: ClassKind,
    pub super_class: Option<String>,
    /// Transitive supertypes including self. Order is significant: the list
    /// is used verbatim as the class-cache key.
    pub ancestors: Vec<String>,
    /// JS name path for raw JS types (e.g. `"window.HTMLElement"`).
    pub js_name: Option<String>,
    pub fields: Vec<FieldDef>,
    pub static_methods: Vec<MethodDef>,
    pub member_methods: Vec<MethodDef>,
    pub exported_members: Vec<MemberDef>,
    pub class_exports: Vec<ClassExport>,
    pub has_instances: bool,
    pub has_instance_tests: bool,
    pub has_runtime_type_info: bool,
    /// Opaque content identity; `None` always invalidates.
    pub version: Option<String>,
}

impl LinkedClass {
    /// Display name used in runtime strings and error messages.
    pub fn display_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.encoded_name)
    }
}

/// A field of a class; the type only selects the JS zero value.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub tpe: Type,
}

/// A method with a desugarable body.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Encoded method name (constructor methods match
    /// [`definitions::is_constructor_name`]).
    pub name: String,
    pub params: Vec<ParamDef>,
    pub body: Expr,
    /// Opaque content identity; `None` always invalidates.
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: String,
}

impl ParamDef {
    pub fn new(name: impl Into<String>) -> Self {
        ParamDef { name: name.into() }
    }
}

/// A property with an optional getter and setter, exported under a
/// string-literal JS name.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub js_name: String,
    pub getter_body: Option<Expr>,
    pub setter: Option<(ParamDef, Expr)>,
}

/// A member in exported position. Only methods and properties are legal
/// there; a field is the `IllegalExportedMember` error.
#[derive(Debug, Clone)]
pub enum MemberDef {
    /// An exported method; `js_name` is the string-literal member name.
    Method { js_name: String, method: MethodDef },
    Property(PropertyDef),
    Field(FieldDef),
}

/// A class-level export directive.
#[derive(Debug, Clone)]
pub enum ClassExport {
    /// An exported constructor function under a dotted JS path.
    Constructor {
        js_name: String,
        params: Vec<ParamDef>,
        body: Expr,
    },
    /// An exported module accessor under a dotted JS path.
    Module { js_name: String },
}

impl ClassExport {
    pub fn js_name(&self) -> &str {
        match self {
            ClassExport::Constructor { js_name, .. } => js_name,
            ClassExport::Module { js_name } => js_name,
        }
    }
}
