//! Variable Scopes
//!
//! Lexical frames for name resolution. Frames live in an arena with
//! parent indexes; resolution walks parent-ward and promotes hits into
//! every intermediate frame's referenced set. A variable leaves its
//! frame's unreferenced registry on first resolution, which is what the
//! unused-variable pass enumerates afterwards; the declared list itself
//! keeps every declaration.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::parse_util::ParseSourceSpan;
use crate::script::ast::NodeId;
use crate::types::dsl::{ClassMember, DslScope};
use crate::types::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Local,
    Parameter,
    /// A DSL member captured as a variable (module-level definitions,
    /// process inputs).
    Field,
    IncludeEntry,
    /// Unbound placeholder kept so one unknown name reports once.
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub ty: Type,
    /// Declaration site; `None` for synthetic built-ins.
    pub decl: Option<NodeId>,
    pub span: ParseSourceSpan,
    /// Captured by a closure below its declaring frame.
    pub closure_shared: bool,
}

impl Variable {
    pub fn local(name: impl Into<String>, decl: NodeId, span: ParseSourceSpan) -> Self {
        Variable {
            name: name.into(),
            kind: VarKind::Local,
            ty: Type::Dynamic,
            decl: Some(decl),
            span,
            closure_shared: false,
        }
    }

    pub fn parameter(name: impl Into<String>, decl: NodeId, span: ParseSourceSpan) -> Self {
        Variable { kind: VarKind::Parameter, ..Variable::local(name, decl, span) }
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_kind(mut self, kind: VarKind) -> Self {
        self.kind = kind;
        self
    }
}

/// What a name resolved to.
#[derive(Debug, Clone)]
pub enum Resolution {
    Variable(Variable),
    /// Member of an active DSL surface.
    Member { scope_name: &'static str, member: &'static ClassMember },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Workflow { entry: bool },
    Process,
    Function,
    Closure,
    Catch,
    Block,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<usize>,
    /// Every declaration made in this frame, in order.
    pub declared: Vec<Variable>,
    /// Declared but not yet resolved; drained by `resolve`.
    unreferenced: HashMap<String, usize>,
    /// Outer variables promoted into this frame.
    referenced_local: HashMap<String, Variable>,
    /// DSL members promoted into this frame.
    referenced_class: HashMap<String, (&'static str, &'static ClassMember)>,
    /// DSL surfaces visible at this nesting, innermost first.
    pub class_scopes: Vec<&'static DslScope>,
}

impl Scope {
    fn find_declared(&self, name: &str) -> Option<&Variable> {
        self.declared.iter().rev().find(|v| v.name == name)
    }

    /// Variables declared here and never resolved, in declaration order.
    pub fn unused(&self) -> Vec<&Variable> {
        let mut indexes: Vec<usize> = self.unreferenced.values().copied().collect();
        indexes.sort_unstable();
        indexes.iter().map(|i| &self.declared[*i]).collect()
    }
}

#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Scope>,
    current: usize,
}

impl ScopeStack {
    pub fn new(class_scopes: Vec<&'static DslScope>) -> Self {
        let root = Scope {
            kind: ScopeKind::Module,
            parent: None,
            declared: Vec::new(),
            unreferenced: HashMap::new(),
            referenced_local: HashMap::new(),
            referenced_class: HashMap::new(),
            class_scopes,
        };
        ScopeStack { frames: vec![root], current: 0 }
    }

    pub fn push(&mut self, kind: ScopeKind, class_scopes: Vec<&'static DslScope>) {
        let frame = Scope {
            kind,
            parent: Some(self.current),
            declared: Vec::new(),
            unreferenced: HashMap::new(),
            referenced_local: HashMap::new(),
            referenced_class: HashMap::new(),
            class_scopes,
        };
        self.frames.push(frame);
        self.current = self.frames.len() - 1;
    }

    pub fn pop(&mut self) {
        if let Some(parent) = self.frames[self.current].parent {
            self.current = parent;
        }
    }

    pub fn current(&self) -> &Scope {
        &self.frames[self.current]
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.frames[self.current].kind
    }

    /// Whether any frame from the current one up to (and excluding) the
    /// first non-closure frame is a closure.
    pub fn in_closure(&self) -> bool {
        let mut index = Some(self.current);
        while let Some(i) = index {
            match self.frames[i].kind {
                ScopeKind::Closure => return true,
                ScopeKind::Block | ScopeKind::Catch => index = self.frames[i].parent,
                _ => return false,
            }
        }
        false
    }

    /// Kind of the nearest enclosing non-block frame.
    pub fn enclosing_kind(&self) -> ScopeKind {
        let mut index = Some(self.current);
        while let Some(i) = index {
            match self.frames[i].kind {
                ScopeKind::Block | ScopeKind::Catch => index = self.frames[i].parent,
                kind => return kind,
            }
        }
        ScopeKind::Module
    }

    /// True when the resolver sits inside the entry workflow.
    pub fn in_entry_workflow(&self) -> bool {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let ScopeKind::Workflow { entry } = self.frames[i].kind {
                return entry;
            }
            index = self.frames[i].parent;
        }
        false
    }

    /// Declare a variable in the current frame. On a name conflict with
    /// this or an ancestor frame's declarations the existing variable is
    /// returned and nothing is declared. Conflict checking stops at the
    /// nearest routine boundary: a workflow, process or function body may
    /// shadow module-level names.
    pub fn declare(&mut self, variable: Variable) -> Result<(), Variable> {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let Some(existing) = self.frames[i].find_declared(&variable.name) {
                return Err(existing.clone());
            }
            if matches!(
                self.frames[i].kind,
                ScopeKind::Workflow { .. } | ScopeKind::Process | ScopeKind::Function
            ) {
                break;
            }
            index = self.frames[i].parent;
        }
        let frame = &mut self.frames[self.current];
        let slot = frame.declared.len();
        // Names starting with an underscore opt out of unused tracking.
        if !variable.name.starts_with('_') {
            frame.unreferenced.insert(variable.name.clone(), slot);
        }
        frame.declared.push(variable);
        Ok(())
    }

    /// Declare into the parent frame of the current one, e.g. process
    /// input variables declared from inside a section frame.
    pub fn declare_in_parent(&mut self, variable: Variable) -> Result<(), Variable> {
        let saved = self.current;
        if let Some(parent) = self.frames[self.current].parent {
            self.current = parent;
        }
        let result = self.declare(variable);
        self.current = saved;
        result
    }

    /// Declare a synthetic binding that never participates in unused
    /// tracking (implicit `it`, placeholders for unknown names).
    pub fn declare_untracked(&mut self, variable: Variable) {
        self.frames[self.current].declared.push(variable);
    }

    /// Declare without conflict checking, for shadow-tolerant synthetic
    /// bindings such as the implicit closure parameter.
    pub fn declare_shadowing(&mut self, variable: Variable) {
        let frame = &mut self.frames[self.current];
        let slot = frame.declared.len();
        if !variable.name.starts_with('_') {
            frame.unreferenced.insert(variable.name.clone(), slot);
        }
        frame.declared.push(variable);
    }

    /// Resolve a name, walking parent-ward: declared first, then the
    /// referenced sets, then DSL members on the class scopes. On success
    /// the hit is promoted into every intermediate frame's referenced set
    /// and removed from its frame's unreferenced registry.
    pub fn resolve(&mut self, name: &str) -> Option<Resolution> {
        // Scope chains are shallow; keep the promotion path inline.
        let mut path: SmallVec<[usize; 8]> = SmallVec::new();
        let mut index = Some(self.current);
        let mut found: Option<(usize, Resolution)> = None;
        let mut crosses_closure = false;

        while let Some(i) = index {
            if self.frames[i].find_declared(name).is_some() {
                self.frames[i].unreferenced.remove(name);
                let mut variable = self.frames[i].find_declared(name).unwrap().clone();
                if crosses_closure {
                    variable.closure_shared = true;
                    if let Some(v) = self.frames[i]
                        .declared
                        .iter_mut()
                        .rev()
                        .find(|v| v.name == name)
                    {
                        v.closure_shared = true;
                    }
                }
                found = Some((i, Resolution::Variable(variable)));
                break;
            }
            if let Some(variable) = self.frames[i].referenced_local.get(name) {
                found = Some((i, Resolution::Variable(variable.clone())));
                break;
            }
            if let Some(&(scope_name, member)) = self.frames[i].referenced_class.get(name) {
                found = Some((i, Resolution::Member { scope_name, member }));
                break;
            }
            if let Some(hit) = self.frames[i]
                .class_scopes
                .iter()
                .find_map(|scope| scope.find(name).map(|member| (scope.name, member)))
            {
                found = Some((i, Resolution::Member { scope_name: hit.0, member: hit.1 }));
                break;
            }
            if self.frames[i].kind == ScopeKind::Closure {
                crosses_closure = true;
            }
            path.push(i);
            index = self.frames[i].parent;
        }

        let (frame_index, resolution) = found?;
        for i in path {
            if i == frame_index {
                continue;
            }
            match &resolution {
                Resolution::Variable(variable) => {
                    self.frames[i]
                        .referenced_local
                        .entry(name.to_string())
                        .or_insert_with(|| variable.clone());
                }
                Resolution::Member { scope_name, member } => {
                    self.frames[i]
                        .referenced_class
                        .entry(name.to_string())
                        .or_insert((*scope_name, *member));
                }
            }
        }
        Some(resolution)
    }

    /// Peek without promotion or unreferenced-drain side effects.
    pub fn lookup(&self, name: &str) -> Option<Resolution> {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let Some(variable) = self.frames[i].find_declared(name) {
                return Some(Resolution::Variable(variable.clone()));
            }
            if let Some(variable) = self.frames[i].referenced_local.get(name) {
                return Some(Resolution::Variable(variable.clone()));
            }
            if let Some(&(scope_name, member)) = self.frames[i].referenced_class.get(name) {
                return Some(Resolution::Member { scope_name, member });
            }
            if let Some(hit) = self.frames[i]
                .class_scopes
                .iter()
                .find_map(|scope| scope.find(name).map(|member| (scope.name, member)))
            {
                return Some(Resolution::Member { scope_name: hit.0, member: hit.1 });
            }
            index = self.frames[i].parent;
        }
        None
    }

    /// Names visible from the current frame, outermost last. Used by
    /// completion.
    pub fn visible_names(&self) -> Vec<(String, Option<Type>)> {
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut index = Some(self.current);
        while let Some(i) = index {
            for variable in self.frames[i].declared.iter().rev() {
                if seen.insert(variable.name.clone()) {
                    out.push((variable.name.clone(), Some(variable.ty.clone())));
                }
            }
            for scope in &self.frames[i].class_scopes {
                for member in &scope.members {
                    if seen.insert(member.name.to_string()) {
                        out.push((member.name.to_string(), Some(member.ret.clone())));
                    }
                }
            }
            index = self.frames[i].parent;
        }
        out
    }

    /// All frames, for the unused-variable pass.
    pub fn frames(&self) -> &[Scope] {
        &self.frames
    }
}
