//! Generates the emitted pieces of a single linked class.
//!
//! Every piece goes through the incremental cache: per-method trees through
//! `MethodCache`s, class-level pieces through the one-shot slots of the
//! `DesugaredClassCache`. The ES6/strong class construct is assembled fresh
//! each run from the individually cached member trees.

use crate::emitter::caches::ClassCache;
use crate::emitter::ctor_opt::{
    candidate_for_js_ctor_opt, MethodRef, CONSTRUCTOR_EXPORT_SENTINEL, EXPORTED_MEMBER_SENTINEL,
    MODULE_ACCESSOR_SENTINEL,
};
use crate::emitter::desugar::{desugar_body, desugar_to_function, desugar_tree, DesugarCtx};
use crate::emitter::env::{env_field, env_function, env_member, env_method_field, helper_ref};
use crate::emitter::type_tags::TypeTags;
use crate::emitter::RunStats;
use crate::errors::EmitterError;
use crate::ir::definitions::{
    is_constructor_name, ARRAY_TAG_DEPTH_MASK, ARRAY_TAG_DEPTH_SHIFT, ARRAY_TAG_ELEMENT_MASK,
    CLASSES_WHOSE_DATA_REFER_TO_THEIR_INSTANCE_TESTS, HIJACKED_TYPEOF, NOTHING_CLASS,
    OBJECT_CLASS, PSEUDO_ARRAY_ANCESTORS, STRING_CLASS, UNDEFINED_BEHAVIOR_ERROR_CLASS,
    UNDEFINED_BEHAVIOR_ERROR_CTOR,
};
use crate::ir::{
    ClassExport, ClassKind, Expr, LinkedClass, MemberDef, MethodDef, PropertyDef, Type,
};
use crate::js::{PropertyName, Tree};
use crate::output_mode::OutputMode;
use crate::semantics::CheckedBehavior;

/// One class's worth of generation state for the current run.
pub(crate) struct ClassGen<'a, 'c> {
    pub ctx: &'c DesugarCtx<'a>,
    pub tags: &'c TypeTags,
    pub class: &'c LinkedClass,
    pub cache: &'c mut ClassCache,
    pub stats: &'c mut RunStats,
}

impl ClassGen<'_, '_> {
    fn wants_constructor(&self) -> bool {
        self.class.has_instances && self.class.kind.is_any_scalajs_defined_class()
    }

    /// Emits the whole class for the non-strong modes, in piece order.
    pub(crate) fn emit_class(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let kind = self.class.kind;
        let wants_ctor = self.wants_constructor();
        let mut out = Vec::new();

        if self.ctx.mode.uses_classes() {
            if !wants_ctor {
                out.extend(self.static_method_trees()?);
            }
            if kind == ClassKind::Interface {
                out.extend(self.default_method_trees()?);
            }
            if wants_ctor {
                out.push(self.class_construct()?);
            }
        } else {
            out.extend(self.static_method_trees()?);
            if wants_ctor {
                out.extend(self.constructor_pieces()?);
            }
            if kind == ClassKind::Interface {
                out.extend(self.default_method_trees()?);
            }
            if wants_ctor {
                out.extend(self.member_method_trees()?);
                out.extend(self.exported_member_trees()?);
            }
        }

        out.extend(self.instance_test_trees()?);
        if self.class.has_runtime_type_info {
            out.extend(self.type_data_trees()?);
        }
        if kind.is_class() && self.class.has_instances && self.class.has_runtime_type_info {
            out.extend(self.set_type_data_trees()?);
        }
        if kind.has_module_accessor() {
            out.extend(self.module_accessor_trees()?);
        }
        if !self.class.class_exports.is_empty() {
            out.extend(self.class_export_trees()?);
        }
        Ok(out)
    }

    // ----- strong-mode phases -------------------------------------------

    pub(crate) fn strong_type_data_decls(&mut self) -> Vec<Tree> {
        if self.class.has_runtime_type_info {
            vec![Tree::var_def(format!("$d_{}", self.class.encoded_name), None)]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn strong_module_decls(&mut self) -> Vec<Tree> {
        if self.class.kind.has_module_accessor() {
            vec![Tree::var_def(format!("$n_{}", self.class.encoded_name), None)]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn strong_is_as(&mut self) -> Result<Vec<Tree>, EmitterError> {
        self.instance_test_trees()
    }

    pub(crate) fn strong_classes(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let mut out = Vec::new();
        if !self.wants_constructor() {
            out.extend(self.static_method_trees()?);
        }
        if self.class.kind == ClassKind::Interface {
            out.extend(self.default_method_trees()?);
        }
        if self.wants_constructor() {
            out.push(self.class_construct()?);
        }
        if self.class.kind.has_module_accessor() {
            out.extend(self.module_accessor_trees()?);
        }
        Ok(out)
    }

    pub(crate) fn strong_create_type_data(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let mut out = Vec::new();
        if self.class.has_runtime_type_info {
            out.extend(self.type_data_trees()?);
            if self.class.kind.is_class() && self.class.has_instances {
                out.extend(self.set_type_data_trees()?);
            }
        }
        Ok(out)
    }

    pub(crate) fn strong_exports(&mut self) -> Result<Vec<Tree>, EmitterError> {
        if self.class.class_exports.is_empty() {
            Ok(Vec::new())
        } else {
            self.class_export_trees()
        }
    }

    // ----- cached pieces ------------------------------------------------

    /// The cached desugared function of a member method. Only the function
    /// tree is cached; the surrounding shape (prototype assignment,
    /// `MethodDef`, function declaration) is rebuilt each run so a class
    /// changing emission shape cannot resurrect a stale wrapper.
    fn cached_member_function(
        &mut self,
        method: &MethodDef,
        this_ident: Option<&str>,
    ) -> Result<Tree, EmitterError> {
        let ctx = self.ctx;
        let class = self.class;
        Ok(self
            .cache
            .method_cache(&method.name)
            .get_or_else_update(method.version.as_deref(), self.stats, || {
                let caller =
                    MethodRef::new(class.encoded_name.as_str(), method.name.as_str(), false);
                desugar_to_function(ctx, &caller, &method.params, &method.body, this_ident)
            })?
            .clone())
    }

    fn cached_static_function(&mut self, method: &MethodDef) -> Result<Tree, EmitterError> {
        let ctx = self.ctx;
        let class = self.class;
        Ok(self
            .cache
            .static_method_cache(&method.name)
            .get_or_else_update(method.version.as_deref(), self.stats, || {
                let caller =
                    MethodRef::new(class.encoded_name.as_str(), method.name.as_str(), true);
                desugar_to_function(ctx, &caller, &method.params, &method.body, None)
            })?
            .clone())
    }

    /// Static methods outside a class construct: `s_` assignments, or
    /// function declarations in strong mode.
    fn static_method_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let class = self.class;
        let mode = self.ctx.mode;
        let mut out = Vec::with_capacity(class.static_methods.len());
        for method in &class.static_methods {
            let function = self.cached_static_function(method)?;
            out.push(if mode.is_strong() {
                let (params, body) = function_parts(function);
                Tree::FunctionDef {
                    name: format!("$s_{}__{}", class.encoded_name, method.name),
                    params,
                    body,
                }
            } else {
                Tree::assign(
                    env_method_field(mode, "s", &class.encoded_name, &method.name),
                    function,
                )
            });
        }
        Ok(out)
    }

    /// Interface default methods: standalone functions taking the receiver
    /// as an explicit `$thiz` first parameter.
    fn default_method_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let class = self.class;
        let mode = self.ctx.mode;
        let mut out = Vec::with_capacity(class.member_methods.len());
        for method in &class.member_methods {
            let function = self.cached_member_function(method, Some("$thiz"))?;
            out.push(if mode.is_strong() {
                let (params, body) = function_parts(function);
                Tree::FunctionDef {
                    name: format!("$f_{}", method.name),
                    params,
                    body,
                }
            } else {
                Tree::assign(
                    env_method_field(mode, "f", &class.encoded_name, &method.name),
                    function,
                )
            });
        }
        Ok(out)
    }

    /// The ES5 constructor piece: ctor function, prototype chain, and the
    /// inheritable-ctor helper.
    fn constructor_pieces(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let ctx = self.ctx;
        let class = self.class;
        let version = class.version.as_deref();
        let trees = self
            .cache
            .get_cache(version, self.stats)
            .constructor
            .get_or_else_update(|| gen_es5_constructor(ctx, class))?
            .clone();
        Ok(trees)
    }

    /// ES5 member methods as prototype assignments. The constructor method
    /// is skipped when the optimized ctor already carries its body.
    fn member_method_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let class = self.class;
        let mode = self.ctx.mode;
        let fused = candidate_for_js_ctor_opt(class);
        let mut out = Vec::new();
        for method in &class.member_methods {
            if fused && is_constructor_name(&method.name) {
                continue;
            }
            let function = self.cached_member_function(method, None)?;
            out.push(Tree::assign(
                Tree::dot(
                    Tree::dot(env_field(mode, "c", &class.encoded_name), "prototype"),
                    method.name.clone(),
                ),
                function,
            ));
        }
        Ok(out)
    }

    /// The ES6/strong class construct, assembled from cached member pieces.
    fn class_construct(&mut self) -> Result<Tree, EmitterError> {
        let ctx = self.ctx;
        let tags = self.tags;
        let class = self.class;
        let version = class.version.as_deref();

        let mut members = self
            .cache
            .get_cache(version, self.stats)
            .constructor
            .get_or_else_update(|| Ok(vec![gen_es6_constructor(ctx, class)?]))?
            .clone();

        // The tag getters carry run-global knowledge, so they are rebuilt
        // fresh instead of cached.
        if ctx.mode.is_strong() && class.has_runtime_type_info {
            members.extend(type_info_getters(ctx, tags, class)?);
        }

        for method in &class.static_methods {
            let function = self.cached_static_function(method)?;
            members.push(function_to_method(
                PropertyName::ident(&method.name),
                true,
                function,
            ));
        }

        let fused = candidate_for_js_ctor_opt(class);
        for method in &class.member_methods {
            if fused && is_constructor_name(&method.name) {
                continue;
            }
            let function = self.cached_member_function(method, None)?;
            members.push(function_to_method(
                PropertyName::ident(&method.name),
                false,
                function,
            ));
        }

        members.extend(
            self.cache
                .get_cache(version, self.stats)
                .exported_members
                .get_or_else_update(|| gen_exported_member_defs(ctx, class))?
                .clone(),
        );

        let parent = match &class.super_class {
            Some(sup) => Some(Box::new(super_class_ref(ctx, class, sup)?)),
            None => None,
        };
        let construct = Tree::Class {
            name: if ctx.mode.is_strong() {
                Some(format!("$c_{}", class.encoded_name))
            } else {
                None
            },
            parent,
            members,
        };
        if ctx.mode.is_strong() {
            Ok(construct)
        } else {
            Ok(Tree::assign(
                env_field(ctx.mode, "c", &class.encoded_name),
                construct,
            ))
        }
    }

    fn exported_member_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let ctx = self.ctx;
        let class = self.class;
        let version = class.version.as_deref();
        let trees = self
            .cache
            .get_cache(version, self.stats)
            .exported_members
            .get_or_else_update(|| gen_es5_exported_members(ctx, class))?
            .clone();
        Ok(trees)
    }

    fn instance_test_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let ctx = self.ctx;
        let tags = self.tags;
        let class = self.class;
        let version = class.version.as_deref();
        let trees = self
            .cache
            .get_cache(version, self.stats)
            .instance_tests
            .get_or_else_update(|| gen_instance_tests(ctx, tags, class))?
            .clone();
        Ok(trees)
    }

    fn type_data_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let ctx = self.ctx;
        let tags = self.tags;
        let class = self.class;
        let version = class.version.as_deref();
        let trees = self
            .cache
            .get_cache(version, self.stats)
            .type_data
            .get_or_else_update(|| gen_type_data(ctx, tags, class))?
            .clone();
        Ok(trees)
    }

    fn set_type_data_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let ctx = self.ctx;
        let tags = self.tags;
        let class = self.class;
        let version = class.version.as_deref();
        let trees = self
            .cache
            .get_cache(version, self.stats)
            .set_type_data
            .get_or_else_update(|| gen_set_type_data(ctx, tags, class))?
            .clone();
        Ok(trees)
    }

    fn module_accessor_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let ctx = self.ctx;
        let class = self.class;
        let version = class.version.as_deref();
        let trees = self
            .cache
            .get_cache(version, self.stats)
            .module_accessor
            .get_or_else_update(|| gen_module_accessor(ctx, class))?
            .clone();
        Ok(trees)
    }

    fn class_export_trees(&mut self) -> Result<Vec<Tree>, EmitterError> {
        let ctx = self.ctx;
        let class = self.class;
        let version = class.version.as_deref();
        let trees = self
            .cache
            .get_cache(version, self.stats)
            .class_exports
            .get_or_else_update(|| gen_class_exports(ctx, class))?
            .clone();
        Ok(trees)
    }
}

// ----- piece generators (pure of the caches) ----------------------------

fn zero_of(tpe: Type) -> Tree {
    match tpe {
        Type::Unit => Tree::Undefined,
        Type::Boolean => Tree::Bool(false),
        Type::Int => Tree::Int(0),
        Type::Double => Tree::Double(0.0),
        Type::Ref => Tree::Null,
    }
}

fn function_parts(function: Tree) -> (Vec<String>, Vec<Tree>) {
    match function {
        Tree::Function { params, body } => (params, body),
        other => unreachable!("desugar_to_function returns a function, got {other:?}"),
    }
}

fn function_to_method(name: PropertyName, is_static: bool, function: Tree) -> Tree {
    let (params, body) = function_parts(function);
    Tree::MethodDef {
        is_static,
        name,
        params,
        body,
    }
}

/// Finds the exported member whose name literal is `"constructor"`; its body
/// becomes the JS class constructor.
fn js_class_constructor<'c>(class: &'c LinkedClass) -> Result<&'c MethodDef, EmitterError> {
    for member in &class.exported_members {
        if let MemberDef::Method { js_name, method } = member
            && js_name == "constructor"
        {
            return Ok(method);
        }
    }
    Err(EmitterError::InvalidInput(format!(
        "JS class {} has no exported constructor",
        class.encoded_name
    )))
}

/// Constructor params and desugared init statements, shared by the ES5 and
/// ES6 shapes.
///
/// The fusion decision goes through `uses_js_constructor_opt` so the cached
/// constructor piece is invalidated when the class's candidacy flips without
/// a version change (the recorded constructor-named caller routes to the
/// constructor slot).
fn constructor_params_and_init(
    ctx: &DesugarCtx<'_>,
    class: &LinkedClass,
) -> Result<(Vec<String>, Vec<Tree>), EmitterError> {
    if class.kind.is_js_class() {
        let ctor = js_class_constructor(class)?;
        let caller = MethodRef::new(class.encoded_name.as_str(), "init___", false);
        let body = desugar_body(ctx, &caller, &ctor.body, None)?;
        return Ok((ctor.params.iter().map(|p| p.name.clone()).collect(), body));
    }
    let self_ref = MethodRef::new(class.encoded_name.as_str(), "init___", false);
    if ctx.uses_js_constructor_opt(&class.encoded_name, &self_ref) {
        let Some(init) = class
            .member_methods
            .iter()
            .find(|m| is_constructor_name(&m.name))
        else {
            unreachable!("ctor-opt candidates have a constructor method");
        };
        let caller = MethodRef::new(class.encoded_name.as_str(), init.name.as_str(), false);
        let body = desugar_body(ctx, &caller, &init.body, None)?;
        Ok((init.params.iter().map(|p| p.name.clone()).collect(), body))
    } else {
        Ok((Vec::new(), Vec::new()))
    }
}

fn super_class_ref(
    ctx: &DesugarCtx<'_>,
    class: &LinkedClass,
    super_name: &str,
) -> Result<Tree, EmitterError> {
    if class.kind.is_js_class() {
        match ctx.linked_class(super_name) {
            Some(sup) if sup.kind == ClassKind::RawJSType => {
                let Some(js_name) = &sup.js_name else {
                    return Err(EmitterError::InvalidInput(format!(
                        "raw JS type {super_name} has no JS name"
                    )));
                };
                let mut parts = js_name.split('.');
                let first = parts.next().unwrap_or_default();
                Ok(parts.fold(Tree::ident(first), Tree::dot))
            }
            _ => Ok(env_field(ctx.mode, "c", super_name)),
        }
    } else {
        Ok(env_field(ctx.mode, "c", super_name))
    }
}

fn gen_es5_constructor(
    ctx: &DesugarCtx<'_>,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let name = &class.encoded_name;
    let class_var = env_field(ctx.mode, "c", name);

    let mut body: Vec<Tree> = class
        .fields
        .iter()
        .map(|f| Tree::assign(Tree::dot(Tree::This, f.name.clone()), zero_of(f.tpe)))
        .collect();
    let (params, init) = constructor_params_and_init(ctx, class)?;
    body.extend(init);

    let mut out = vec![
        Tree::DocComment("@constructor".to_string()),
        Tree::assign(class_var.clone(), Tree::function(params, body)),
    ];

    let proto = Tree::dot(class_var.clone(), "prototype");
    if let Some(sup) = &class.super_class {
        let super_ctor = if class.kind.is_js_class() {
            super_class_ref(ctx, class, sup)?
        } else {
            env_field(ctx.mode, "h", sup)
        };
        out.push(Tree::assign(
            proto.clone(),
            Tree::new_call(super_ctor, vec![]),
        ));
    }
    out.push(Tree::assign(
        Tree::dot(proto.clone(), "constructor"),
        class_var,
    ));

    // JS classes are not Scala-subclassable: no inheritable-ctor helper.
    if !class.kind.is_js_class() {
        let h_var = env_field(ctx.mode, "h", name);
        out.push(Tree::DocComment("@constructor".to_string()));
        out.push(Tree::assign(h_var.clone(), Tree::function(vec![], vec![])));
        out.push(Tree::assign(Tree::dot(h_var, "prototype"), proto));
    }
    Ok(out)
}

fn gen_es6_constructor(ctx: &DesugarCtx<'_>, class: &LinkedClass) -> Result<Tree, EmitterError> {
    let mut body = Vec::new();
    if class.super_class.is_some() {
        body.push(Tree::apply(Tree::Super, vec![]));
    }
    for field in &class.fields {
        body.push(Tree::assign(
            Tree::dot(Tree::This, field.name.clone()),
            zero_of(field.tpe),
        ));
    }
    let (params, init) = constructor_params_and_init(ctx, class)?;
    body.extend(init);
    Ok(Tree::MethodDef {
        is_static: false,
        name: PropertyName::ident("constructor"),
        params,
        body,
    })
}

fn type_info_getters(
    ctx: &DesugarCtx<'_>,
    tags: &TypeTags,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let name = &class.encoded_name;
    let tag = tags
        .tag_of(name)
        .ok_or_else(|| EmitterError::InvalidInput(format!("class {name} has no type tag")))?;
    Ok(vec![
        Tree::GetterDef {
            is_static: false,
            name: PropertyName::str("$classData"),
            body: vec![Tree::ret(Some(env_field(ctx.mode, "d", name)))],
        },
        Tree::GetterDef {
            is_static: false,
            name: PropertyName::str("$typeTag"),
            body: vec![Tree::ret(Some(Tree::Int(tag)))],
        },
    ])
}

fn gen_es5_exported_members(
    ctx: &DesugarCtx<'_>,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let name = &class.encoded_name;
    let proto = Tree::dot(env_field(ctx.mode, "c", name), "prototype");
    let caller = MethodRef::new(name.as_str(), EXPORTED_MEMBER_SENTINEL, false);
    let mut out = Vec::new();
    for member in &class.exported_members {
        match member {
            MemberDef::Method { js_name, method } => {
                if class.kind.is_js_class() && js_name == "constructor" {
                    continue;
                }
                let function =
                    desugar_to_function(ctx, &caller, &method.params, &method.body, None)?;
                out.push(Tree::assign(
                    Tree::bracket(proto.clone(), Tree::str(js_name.clone())),
                    function,
                ));
            }
            MemberDef::Property(property) => {
                out.push(gen_es5_property(ctx, &caller, &proto, property)?);
            }
            MemberDef::Field(_) => {
                return Err(EmitterError::IllegalExportedMember {
                    class_name: name.clone(),
                });
            }
        }
    }
    Ok(out)
}

fn gen_es5_property(
    ctx: &DesugarCtx<'_>,
    caller: &MethodRef,
    proto: &Tree,
    property: &PropertyDef,
) -> Result<Tree, EmitterError> {
    let mut descriptor = Vec::new();
    if let Some(getter_body) = &property.getter_body {
        descriptor.push((
            PropertyName::ident("get"),
            Tree::function(vec![], desugar_body(ctx, caller, getter_body, None)?),
        ));
    }
    if let Some((param, setter_body)) = &property.setter {
        descriptor.push((
            PropertyName::ident("set"),
            Tree::function(
                vec![param.name.clone()],
                desugar_body(ctx, caller, setter_body, None)?,
            ),
        ));
    }
    descriptor.push((PropertyName::ident("configurable"), Tree::Bool(true)));
    Ok(Tree::apply(
        Tree::dot(Tree::ident("Object"), "defineProperty"),
        vec![
            proto.clone(),
            Tree::str(property.js_name.clone()),
            Tree::ObjectConstr(descriptor),
        ],
    ))
}

fn gen_exported_member_defs(
    ctx: &DesugarCtx<'_>,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let caller = MethodRef::new(class.encoded_name.as_str(), EXPORTED_MEMBER_SENTINEL, false);
    let mut out = Vec::new();
    for member in &class.exported_members {
        match member {
            MemberDef::Method { js_name, method } => {
                if class.kind.is_js_class() && js_name == "constructor" {
                    continue;
                }
                let function =
                    desugar_to_function(ctx, &caller, &method.params, &method.body, None)?;
                out.push(function_to_method(
                    PropertyName::str(js_name.clone()),
                    false,
                    function,
                ));
            }
            MemberDef::Property(property) => {
                if let Some(getter_body) = &property.getter_body {
                    out.push(Tree::GetterDef {
                        is_static: false,
                        name: PropertyName::str(property.js_name.clone()),
                        body: desugar_body(ctx, &caller, getter_body, None)?,
                    });
                }
                if let Some((param, setter_body)) = &property.setter {
                    out.push(Tree::SetterDef {
                        is_static: false,
                        name: PropertyName::str(property.js_name.clone()),
                        param: param.name.clone(),
                        body: desugar_body(ctx, &caller, setter_body, None)?,
                    });
                }
            }
            MemberDef::Field(_) => {
                return Err(EmitterError::IllegalExportedMember {
                    class_name: class.encoded_name.clone(),
                });
            }
        }
    }
    Ok(out)
}

fn need_instance_tests(class: &LinkedClass) -> bool {
    class.has_instance_tests
        || (class.has_runtime_type_info
            && CLASSES_WHOSE_DATA_REFER_TO_THEIR_INSTANCE_TESTS
                .contains(class.encoded_name.as_str()))
}

fn gen_instance_tests(
    ctx: &DesugarCtx<'_>,
    tags: &TypeTags,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let name = class.encoded_name.as_str();
    let mode = ctx.mode;
    let mut out = Vec::new();

    if tags.needs_subtype_array(name) {
        let intervals = tags
            .intervals_of(name)
            .iter()
            .map(|&(lo, hi)| Tree::ArrayConstr(vec![Tree::Int(lo), Tree::Int(hi)]))
            .collect();
        out.push(Tree::assign(
            env_field(mode, "Is", name),
            Tree::apply(
                helper_ref(mode, "expandSubtypeArray"),
                vec![Tree::ArrayConstr(intervals)],
            ),
        ));
    }

    if need_instance_tests(class) {
        out.push(env_function(
            mode,
            "is",
            name,
            vec!["obj".to_string()],
            is_test_body(ctx, tags, class),
        ));
        out.push(env_function(
            mode,
            "as",
            name,
            vec!["obj".to_string()],
            as_test_body(ctx, class),
        ));
    }

    out.push(env_function(
        mode,
        "isArrayOf",
        name,
        vec!["obj".to_string(), "depth".to_string()],
        is_array_of_body(ctx, tags, class),
    ));
    out.push(env_function(
        mode,
        "asArrayOf",
        name,
        vec!["obj".to_string(), "depth".to_string()],
        as_array_of_body(ctx, class),
    ));
    Ok(out)
}

/// The inline or array-backed membership test for `tag_expr` against the
/// descendant set of `class_name`.
fn intervals_test(mode: OutputMode, tags: &TypeTags, class_name: &str, tag_expr: Tree) -> Tree {
    if tags.needs_subtype_array(class_name) {
        return Tree::to_boolean(Tree::bracket(env_field(mode, "Is", class_name), tag_expr));
    }
    let intervals = tags.intervals_of(class_name);
    if intervals.is_empty() {
        return Tree::Bool(false);
    }
    let terms = intervals
        .iter()
        .map(|&(lo, hi)| {
            if lo == hi {
                Tree::binary("===", tag_expr.clone(), Tree::Int(lo))
            } else {
                Tree::binary(
                    "&&",
                    Tree::binary(">=", tag_expr.clone(), Tree::Int(lo)),
                    Tree::binary("<=", tag_expr.clone(), Tree::Int(hi)),
                )
            }
        })
        .collect();
    Tree::or_chain(terms)
}

fn is_test_body(ctx: &DesugarCtx<'_>, tags: &TypeTags, class: &LinkedClass) -> Vec<Tree> {
    let name = class.encoded_name.as_str();
    let obj = Tree::ident("obj");

    if name == OBJECT_CLASS {
        return vec![Tree::ret(Some(Tree::binary("!==", obj, Tree::Null)))];
    }
    if name == NOTHING_CLASS {
        return vec![Tree::ret(Some(Tree::Bool(false)))];
    }
    if name == "sr_BoxedUnit" {
        return vec![Tree::ret(Some(Tree::binary("===", obj, Tree::Undefined)))];
    }
    if name == STRING_CLASS || HIJACKED_TYPEOF.contains_key(name) {
        let typeof_name = HIJACKED_TYPEOF[name];
        return vec![Tree::ret(Some(Tree::binary(
            "===",
            Tree::unary("typeof", obj),
            Tree::str(typeof_name),
        )))];
    }

    let tag_sel = Tree::dot(obj.clone(), "$typeTag");
    let mut tag_test = intervals_test(ctx.mode, tags, name, tag_sel.clone());
    if PSEUDO_ARRAY_ANCESTORS.contains(name) {
        tag_test = Tree::binary(
            "||",
            tag_test,
            Tree::binary("<", tag_sel, Tree::Int(0)),
        );
    }

    let mut terms: Vec<Tree> = crate::ir::definitions::hijacked_ancestor_typeofs(name)
        .iter()
        .map(|t| Tree::binary("===", Tree::unary("typeof", obj.clone()), Tree::str(*t)))
        .collect();
    terms.push(Tree::binary("&&", obj, tag_test));
    vec![Tree::ret(Some(Tree::to_boolean(Tree::or_chain(terms))))]
}

fn as_test_body(ctx: &DesugarCtx<'_>, class: &LinkedClass) -> Vec<Tree> {
    let name = class.encoded_name.as_str();
    let obj = Tree::ident("obj");
    if ctx.semantics.as_instance_ofs == CheckedBehavior::Unchecked {
        return vec![Tree::ret(Some(obj))];
    }
    let cond = Tree::binary(
        "||",
        Tree::apply(env_field(ctx.mode, "is", name), vec![obj.clone()]),
        Tree::binary("===", obj.clone(), Tree::Null),
    );
    let throw_call = Tree::apply(
        helper_ref(ctx.mode, "throwClassCastException"),
        vec![obj.clone(), Tree::str(class.display_name().to_owned())],
    );
    vec![Tree::if_stmt(
        cond,
        Tree::Block(vec![Tree::ret(Some(obj))]),
        Some(Tree::Block(vec![throw_call])),
    )]
}

fn is_array_of_body(ctx: &DesugarCtx<'_>, tags: &TypeTags, class: &LinkedClass) -> Vec<Tree> {
    let name = class.encoded_name.as_str();
    let obj = Tree::ident("obj");
    let depth = Tree::ident("depth");

    if name == OBJECT_CLASS {
        // Any non-primitive array of sufficient depth is an array of Object.
        let data = Tree::ident("data");
        let array_depth = Tree::ident("arrayDepth");
        return vec![
            Tree::var_def(
                "data",
                Some(Tree::binary(
                    "&&",
                    obj.clone(),
                    Tree::dot(obj, "$classData"),
                )),
            ),
            Tree::if_stmt(
                Tree::unary("!", data.clone()),
                Tree::Block(vec![Tree::ret(Some(Tree::Bool(false)))]),
                Some(Tree::Block(vec![
                    Tree::var_def(
                        "arrayDepth",
                        Some(Tree::binary(
                            "||",
                            Tree::dot(data.clone(), "arrayDepth"),
                            Tree::Int(0),
                        )),
                    ),
                    Tree::ret(Some(Tree::conditional(
                        Tree::binary("<", array_depth.clone(), depth.clone()),
                        Tree::Bool(false),
                        Tree::conditional(
                            Tree::binary(">", array_depth, depth),
                            Tree::Bool(true),
                            Tree::unary(
                                "!",
                                Tree::dot(Tree::dot(data, "arrayBase"), "isPrimitive"),
                            ),
                        ),
                    ))),
                ])),
            ),
        ];
    }

    // Sign bit marks arrays, bits 23..30 the depth, the low 23 bits the
    // element class tag.
    let tag_sel = Tree::dot(obj.clone(), "$typeTag");
    let is_array = Tree::binary("<", tag_sel.clone(), Tree::Int(0));
    let depth_matches = Tree::binary(
        "===",
        Tree::binary(
            "&",
            Tree::binary(">>", tag_sel.clone(), Tree::Int(ARRAY_TAG_DEPTH_SHIFT)),
            Tree::Int(ARRAY_TAG_DEPTH_MASK),
        ),
        depth,
    );
    let element_test = intervals_test(
        ctx.mode,
        tags,
        name,
        Tree::binary("&", tag_sel, Tree::Int(ARRAY_TAG_ELEMENT_MASK)),
    );
    vec![Tree::ret(Some(Tree::to_boolean(Tree::binary(
        "&&",
        Tree::binary("&&", Tree::binary("&&", obj, is_array), depth_matches),
        element_test,
    ))))]
}

fn as_array_of_body(ctx: &DesugarCtx<'_>, class: &LinkedClass) -> Vec<Tree> {
    let name = class.encoded_name.as_str();
    let obj = Tree::ident("obj");
    let depth = Tree::ident("depth");
    if ctx.semantics.as_instance_ofs == CheckedBehavior::Unchecked {
        return vec![Tree::ret(Some(obj))];
    }
    let cond = Tree::binary(
        "||",
        Tree::apply(
            env_field(ctx.mode, "isArrayOf", name),
            vec![obj.clone(), depth.clone()],
        ),
        Tree::binary("===", obj.clone(), Tree::Null),
    );
    let throw_call = Tree::apply(
        helper_ref(ctx.mode, "throwArrayCastException"),
        vec![
            obj.clone(),
            Tree::str(format!("L{};", class.display_name())),
            depth,
        ],
    );
    vec![Tree::if_stmt(
        cond,
        Tree::Block(vec![Tree::ret(Some(obj))]),
        Some(Tree::Block(vec![throw_call])),
    )]
}

fn gen_type_data(
    ctx: &DesugarCtx<'_>,
    tags: &TypeTags,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let name = class.encoded_name.as_str();
    let mode = ctx.mode;
    let tag = tags
        .tag_of(name)
        .ok_or_else(|| EmitterError::InvalidInput(format!("class {name} has no type tag")))?;
    let ancestor_tags = class
        .ancestors
        .iter()
        .filter_map(|a| tags.tag_of(a))
        .map(Tree::Int)
        .collect();

    let mut args = vec![
        Tree::str(name.to_owned()),
        Tree::Bool(class.kind == ClassKind::Interface),
        Tree::str(class.display_name().to_owned()),
        Tree::ArrayConstr(ancestor_tags),
        Tree::Int(tag),
        if class.kind == ClassKind::RawJSType {
            Tree::Bool(true)
        } else {
            Tree::Undefined
        },
        match &class.super_class {
            Some(sup) => env_field(mode, "d", sup),
            None => Tree::Undefined,
        },
        if CLASSES_WHOSE_DATA_REFER_TO_THEIR_INSTANCE_TESTS.contains(name) {
            env_field(mode, "is", name)
        } else {
            Tree::Undefined
        },
        if name == OBJECT_CLASS {
            env_field(mode, "isArrayOf", name)
        } else {
            Tree::Undefined
        },
    ];
    if !mode.is_strong() {
        while args.last() == Some(&Tree::Undefined) {
            args.pop();
        }
    }

    Ok(vec![Tree::assign(
        env_field(mode, "d", name),
        Tree::apply(
            Tree::dot(
                Tree::new_call(env_member(mode, "TypeData"), vec![]),
                "initClass",
            ),
            args,
        ),
    )])
}

fn gen_set_type_data(
    ctx: &DesugarCtx<'_>,
    tags: &TypeTags,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let name = class.encoded_name.as_str();
    let mode = ctx.mode;
    let tag = tags
        .tag_of(name)
        .ok_or_else(|| EmitterError::InvalidInput(format!("class {name} has no type tag")))?;
    if mode.is_strong() {
        Ok(vec![Tree::assign(
            Tree::bracket(env_member(mode, "ClassData"), Tree::Int(tag)),
            env_field(mode, "d", name),
        )])
    } else {
        let proto = Tree::dot(env_field(mode, "c", name), "prototype");
        Ok(vec![
            Tree::assign(
                Tree::dot(proto.clone(), "$classData"),
                env_field(mode, "d", name),
            ),
            Tree::assign(Tree::dot(proto, "$typeTag"), Tree::Int(tag)),
        ])
    }
}

fn gen_module_accessor(
    ctx: &DesugarCtx<'_>,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let name = class.encoded_name.as_str();
    let mode = ctx.mode;
    let caller = MethodRef::new(name, MODULE_ACCESSOR_SENTINEL, false);
    let instance = env_field(mode, "n", name);

    let new_instance = if class.kind.is_js_class() {
        Expr::JSNew {
            ctor: Box::new(Expr::LoadJSConstructor(name.to_owned())),
            args: vec![],
        }
    } else {
        let Some(init) = class
            .member_methods
            .iter()
            .find(|m| is_constructor_name(&m.name))
        else {
            return Err(EmitterError::InvalidInput(format!(
                "module class {name} has no constructor method"
            )));
        };
        Expr::New {
            class_name: name.to_owned(),
            ctor: init.name.clone(),
            args: vec![],
        }
    };
    let assign_instance = desugar_tree(
        ctx,
        &caller,
        &Expr::StoreModule {
            class_name: name.to_owned(),
            value: Box::new(new_instance),
        },
        true,
    )?;

    let mut body = Vec::new();
    match ctx.semantics.module_init {
        CheckedBehavior::Unchecked => {
            body.push(Tree::if_stmt(
                Tree::unary("!", instance.clone()),
                Tree::Block(vec![assign_instance]),
                None,
            ));
        }
        CheckedBehavior::Compliant | CheckedBehavior::Fatal => {
            let thenp = Tree::Block(vec![
                Tree::assign(instance.clone(), Tree::Null),
                assign_instance,
            ]);
            let elsep = if ctx.semantics.module_init == CheckedBehavior::Fatal {
                let message = format!(
                    "Initializer of {} called before completion of its super constructor",
                    class.display_name()
                );
                let throw_ube = desugar_tree(
                    ctx,
                    &caller,
                    &Expr::Throw(Box::new(Expr::New {
                        class_name: UNDEFINED_BEHAVIOR_ERROR_CLASS.to_owned(),
                        ctor: UNDEFINED_BEHAVIOR_ERROR_CTOR.to_owned(),
                        args: vec![Expr::str(message)],
                    })),
                    true,
                )?;
                Some(Tree::if_stmt(
                    Tree::binary("===", instance.clone(), Tree::Null),
                    Tree::Block(vec![throw_ube]),
                    None,
                ))
            } else {
                None
            };
            body.push(Tree::if_stmt(
                Tree::binary("===", instance.clone(), Tree::Undefined),
                thenp,
                elsep,
            ));
        }
    }
    body.push(Tree::ret(Some(instance.clone())));

    let mut out = Vec::new();
    if !mode.is_strong() {
        out.push(Tree::assign(instance, Tree::Undefined));
    }
    out.push(env_function(mode, "m", name, vec![], body));
    Ok(out)
}

fn gen_class_exports(
    ctx: &DesugarCtx<'_>,
    class: &LinkedClass,
) -> Result<Vec<Tree>, EmitterError> {
    let name = class.encoded_name.as_str();
    let mode = ctx.mode;
    let mut out = Vec::new();
    for export in &class.class_exports {
        match export {
            ClassExport::Constructor {
                js_name,
                params,
                body,
            } => {
                let caller = MethodRef::new(name, CONSTRUCTOR_EXPORT_SENTINEL, false);
                let function = desugar_to_function(ctx, &caller, params, body, None)?;
                if mode.is_strong() {
                    out.push(Tree::apply(
                        Tree::ident("$exportCtor"),
                        vec![Tree::str(js_name.clone()), function],
                    ));
                } else {
                    let (mut stmts, lhs) = export_path(mode, js_name);
                    stmts.push(Tree::assign(lhs.clone(), function));
                    stmts.push(Tree::assign(
                        Tree::dot(lhs, "prototype"),
                        Tree::dot(env_field(mode, "c", name), "prototype"),
                    ));
                    out.extend(stmts);
                }
            }
            ClassExport::Module { js_name } => {
                if mode.is_strong() {
                    out.push(Tree::apply(
                        Tree::ident("$export"),
                        vec![Tree::str(js_name.clone()), env_field(mode, "m", name)],
                    ));
                } else {
                    let (mut stmts, lhs) = export_path(mode, js_name);
                    stmts.push(Tree::assign(lhs, env_field(mode, "m", name)));
                    out.extend(stmts);
                }
            }
        }
    }
    Ok(out)
}

/// Builds the dotted namespace chain under the exports root and returns the
/// statements plus the final assignable path.
fn export_path(mode: OutputMode, js_name: &str) -> (Vec<Tree>, Tree) {
    let mut segments: Vec<&str> = js_name.split('.').collect();
    let last = segments.pop().unwrap_or_default();
    let mut base = env_member(mode, "e");
    let mut stmts = Vec::new();
    for segment in segments {
        base = Tree::dot(base, segment);
        stmts.push(Tree::assign(
            base.clone(),
            Tree::binary("||", base.clone(), Tree::ObjectConstr(vec![])),
        ));
    }
    (stmts, Tree::dot(base, last))
}
