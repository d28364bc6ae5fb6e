//! DSL Surface Tables
//!
//! Every DSL surface (script globals, channel factory, channel operators,
//! process directives and qualifiers, per-type methods, operator classes)
//! is a flat table of members consulted by name resolution and the type
//! checker. Tables are data, not a class hierarchy.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::ty::{Type, TypeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Constant,
    /// A dotted namespace such as `Channel` or `workflow`.
    Namespace,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub name: &'static str,
    pub kind: MemberKind,
    pub params: Vec<Type>,
    pub ret: Type,
    pub varargs: bool,
    pub doc: &'static str,
    pub deprecated: Option<&'static str>,
}

impl ClassMember {
    pub fn signature(&self) -> String {
        match self.kind {
            MemberKind::Method => {
                let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
                format!("{}({}) -> {}", self.name, params.join(", "), self.ret)
            }
            _ => format!("{}: {}", self.name, self.ret),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DslScope {
    pub name: &'static str,
    pub members: Vec<ClassMember>,
}

impl DslScope {
    pub fn find(&self, name: &str) -> Option<&ClassMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a ClassMember> {
        self.members.iter().filter(|m| m.name == name).collect()
    }
}

/// Operator method on an ops class: one operand, one result.
#[derive(Debug, Clone)]
pub struct OpMethod {
    pub name: &'static str,
    pub param: Option<Type>,
    pub ret: Type,
}

// -- construction helpers ---------------------------------------------------

fn t(name: TypeName) -> Type {
    Type::named(name)
}

fn ph(name: &str) -> Type {
    Type::placeholder(name)
}

fn list_of(item: Type) -> Type {
    Type::of(TypeName::List, vec![item])
}

fn channel_of(item: Type) -> Type {
    Type::of(TypeName::Channel, vec![item])
}

fn value_of(item: Type) -> Type {
    Type::of(TypeName::Value, vec![item])
}

fn func(params: Vec<Type>, ret: Type) -> Type {
    Type::function(params, ret)
}

fn m(name: &'static str, params: Vec<Type>, ret: Type, doc: &'static str) -> ClassMember {
    ClassMember {
        name,
        kind: MemberKind::Method,
        params,
        ret,
        varargs: false,
        doc,
        deprecated: None,
    }
}

fn mv(name: &'static str, params: Vec<Type>, ret: Type, doc: &'static str) -> ClassMember {
    ClassMember { varargs: true, ..m(name, params, ret, doc) }
}

fn c(name: &'static str, ret: Type, doc: &'static str) -> ClassMember {
    ClassMember {
        name,
        kind: MemberKind::Constant,
        params: Vec::new(),
        ret,
        varargs: false,
        doc,
        deprecated: None,
    }
}

fn ns(name: &'static str, doc: &'static str) -> ClassMember {
    ClassMember {
        name,
        kind: MemberKind::Namespace,
        params: Vec::new(),
        ret: Type::Dynamic,
        varargs: false,
        doc,
        deprecated: None,
    }
}

fn dep(member: ClassMember, note: &'static str) -> ClassMember {
    ClassMember { deprecated: Some(note), ..member }
}

fn op(name: &'static str, param: Type, ret: Type) -> OpMethod {
    OpMethod { name, param: Some(param), ret }
}

fn op0(name: &'static str, ret: Type) -> OpMethod {
    OpMethod { name, param: None, ret }
}

// -- scopes -----------------------------------------------------------------

static GLOBAL_SCOPE: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "script",
    members: vec![
        mv("println", vec![Type::Dynamic], Type::Dynamic, "Print a value followed by a newline."),
        mv("print", vec![Type::Dynamic], Type::Dynamic, "Print a value without a trailing newline."),
        m("error", vec![t(TypeName::String)], Type::Dynamic, "Abort the run with an error message."),
        m(
            "file",
            vec![t(TypeName::String)],
            t(TypeName::Path),
            "Resolve a file path, optionally with glob characters.",
        ),
        m(
            "files",
            vec![t(TypeName::String)],
            list_of(t(TypeName::Path)),
            "Resolve a glob pattern to the list of matching paths.",
        ),
        m("env", vec![t(TypeName::String)], t(TypeName::String), "Read an environment variable."),
        m("sleep", vec![t(TypeName::Integer)], Type::Dynamic, "Pause for the given number of milliseconds."),
        mv("tuple", vec![Type::Dynamic], Type::Tuple(vec![Type::Dynamic]), "Build a tuple from its arguments."),
        c("params", t(TypeName::Map), "Pipeline parameters from the command line and config."),
        c("args", list_of(t(TypeName::String)), "Positional command line arguments."),
        c("launchDir", t(TypeName::Path), "Directory the workflow was launched from."),
        c("projectDir", t(TypeName::Path), "Directory of the main script."),
        c("workDir", t(TypeName::Path), "Directory where task work directories are created."),
        dep(
            c("baseDir", t(TypeName::Path), "Directory of the main script."),
            "use `projectDir` instead",
        ),
        c("moduleDir", t(TypeName::Path), "Directory of the enclosing module script."),
        c("secrets", t(TypeName::Map), "Pipeline secrets."),
        ns("Channel", "Channel factory."),
        ns("channel", "Channel factory."),
        ns("workflow", "Workflow metadata and lifecycle handlers."),
        ns("nextflow", "Runtime metadata."),
        ns("log", "Run log."),
    ],
});

static CHANNEL_FACTORY: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "Channel",
    members: vec![
        mv(
            "of",
            vec![ph("T")],
            channel_of(ph("T")),
            "Emit the given values and close.",
        ),
        m(
            "fromList",
            vec![list_of(ph("T"))],
            channel_of(ph("T")),
            "Emit every element of a list.",
        ),
        m(
            "fromPath",
            vec![t(TypeName::String)],
            channel_of(t(TypeName::Path)),
            "Emit paths matching a glob pattern.",
        ),
        m(
            "fromFilePairs",
            vec![t(TypeName::String)],
            channel_of(Type::Dynamic),
            "Emit grouped file pairs matching a glob pattern.",
        ),
        m(
            "fromSRA",
            vec![t(TypeName::String)],
            channel_of(Type::Dynamic),
            "Emit FASTQ files for an SRA accession.",
        ),
        m("value", vec![ph("T")], value_of(ph("T")), "Create a value channel."),
        m("empty", vec![], channel_of(Type::Dynamic), "A channel emitting nothing."),
        m(
            "watchPath",
            vec![t(TypeName::String)],
            channel_of(t(TypeName::Path)),
            "Watch a glob pattern for file system events.",
        ),
        m(
            "topic",
            vec![t(TypeName::String)],
            channel_of(Type::Dynamic),
            "Subscribe to a topic channel.",
        ),
        dep(
            m("create", vec![], channel_of(Type::Dynamic), "Create an open channel."),
            "use `Channel.of` or `Channel.empty` instead",
        ),
    ],
});

static WORKFLOW_METADATA: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "workflow",
    members: vec![
        c("name", t(TypeName::String), "Run name."),
        c("runName", t(TypeName::String), "Mnemonic run name."),
        c("launchDir", t(TypeName::Path), "Launch directory."),
        c("projectDir", t(TypeName::Path), "Project directory."),
        c("workDir", t(TypeName::Path), "Work directory."),
        c("success", t(TypeName::Boolean), "Whether the run completed successfully."),
        c("exitStatus", t(TypeName::Integer), "Exit status of the run."),
        c("errorMessage", t(TypeName::String), "Error message of a failed run."),
        c("start", Type::Dynamic, "Run start timestamp."),
        c("complete", Type::Dynamic, "Run completion timestamp."),
        c("duration", t(TypeName::Duration), "Wall-clock duration of the run."),
        c("commandLine", t(TypeName::String), "Command line of the run."),
        c("profile", t(TypeName::String), "Active configuration profiles."),
        c("sessionId", t(TypeName::String), "Unique session identifier."),
        c("resume", t(TypeName::Boolean), "Whether the run was resumed."),
        m(
            "onComplete",
            vec![func(vec![], Type::Dynamic)],
            Type::Dynamic,
            "Register a completion handler.",
        ),
        m(
            "onError",
            vec![func(vec![], Type::Dynamic)],
            Type::Dynamic,
            "Register an error handler.",
        ),
    ],
});

static NEXTFLOW_METADATA: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "nextflow",
    members: vec![
        c("version", t(TypeName::String), "Runtime version."),
        c("build", t(TypeName::Integer), "Runtime build number."),
        c("timestamp", t(TypeName::String), "Runtime build timestamp."),
        ns("enable", "Feature flags."),
        ns("preview", "Preview feature flags."),
    ],
});

static LOG_SCOPE: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "log",
    members: vec![
        m("info", vec![t(TypeName::String)], Type::Dynamic, "Log at info level."),
        m("warn", vec![t(TypeName::String)], Type::Dynamic, "Log at warning level."),
        m("error", vec![t(TypeName::String)], Type::Dynamic, "Log at error level."),
        m("debug", vec![t(TypeName::String)], Type::Dynamic, "Log at debug level."),
    ],
});

static PROCESS_DIRECTIVES: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "process directives",
    members: vec![
        m("accelerator", vec![t(TypeName::Integer)], Type::Dynamic, "Request hardware accelerators."),
        m("afterScript", vec![t(TypeName::String)], Type::Dynamic, "Shell snippet run after the task."),
        m("beforeScript", vec![t(TypeName::String)], Type::Dynamic, "Shell snippet run before the task."),
        m("cache", vec![Type::Dynamic], Type::Dynamic, "Task cache mode."),
        m("clusterOptions", vec![t(TypeName::String)], Type::Dynamic, "Native grid scheduler options."),
        m("conda", vec![t(TypeName::String)], Type::Dynamic, "Conda environment for the task."),
        m("container", vec![t(TypeName::String)], Type::Dynamic, "Container image for the task."),
        m("containerOptions", vec![t(TypeName::String)], Type::Dynamic, "Extra container engine options."),
        m("cpus", vec![t(TypeName::Integer)], Type::Dynamic, "Number of CPUs to request."),
        m("debug", vec![t(TypeName::Boolean)], Type::Dynamic, "Echo task stdout to the terminal."),
        m("disk", vec![t(TypeName::MemoryUnit)], Type::Dynamic, "Disk space to request."),
        dep(
            m("echo", vec![t(TypeName::Boolean)], Type::Dynamic, "Echo task stdout."),
            "use `debug` instead",
        ),
        m("errorStrategy", vec![t(TypeName::String)], Type::Dynamic, "What to do when the task fails."),
        m("executor", vec![t(TypeName::String)], Type::Dynamic, "Executor used to run the task."),
        m("label", vec![t(TypeName::String)], Type::Dynamic, "Attach a label for configuration selectors."),
        m("machineType", vec![t(TypeName::String)], Type::Dynamic, "Cloud machine type."),
        m("maxErrors", vec![t(TypeName::Integer)], Type::Dynamic, "Max total failures before giving up."),
        m("maxForks", vec![t(TypeName::Integer)], Type::Dynamic, "Max parallel task instances."),
        m("maxRetries", vec![t(TypeName::Integer)], Type::Dynamic, "Max retries per task instance."),
        m("memory", vec![t(TypeName::MemoryUnit)], Type::Dynamic, "Memory to request."),
        m("module", vec![t(TypeName::String)], Type::Dynamic, "Environment modules to load."),
        m("penv", vec![t(TypeName::String)], Type::Dynamic, "SGE parallel environment."),
        mv("publishDir", vec![Type::Dynamic], Type::Dynamic, "Publish task outputs to a directory."),
        m("queue", vec![t(TypeName::String)], Type::Dynamic, "Grid queue to submit to."),
        m("scratch", vec![Type::Dynamic], Type::Dynamic, "Run in a node-local scratch directory."),
        m("secret", vec![t(TypeName::String)], Type::Dynamic, "Expose a secret to the task."),
        m("shell", vec![Type::Dynamic], Type::Dynamic, "Shell interpreter for the script."),
        m("spack", vec![t(TypeName::String)], Type::Dynamic, "Spack environment for the task."),
        m("stageInMode", vec![t(TypeName::String)], Type::Dynamic, "How inputs are staged in."),
        m("stageOutMode", vec![t(TypeName::String)], Type::Dynamic, "How outputs are staged out."),
        m("storeDir", vec![t(TypeName::String)], Type::Dynamic, "Permanent cache directory."),
        m("tag", vec![t(TypeName::String)], Type::Dynamic, "Human-readable task tag."),
        m("time", vec![t(TypeName::Duration)], Type::Dynamic, "Wall-time limit for the task."),
    ],
});

static PROCESS_INPUTS: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "process inputs",
    members: vec![
        m("val", vec![Type::Dynamic], Type::Dynamic, "Input value."),
        m("path", vec![Type::Dynamic], t(TypeName::Path), "Input file staged into the task directory."),
        dep(
            m("file", vec![Type::Dynamic], t(TypeName::Path), "Input file."),
            "use `path` instead",
        ),
        m("env", vec![Type::Dynamic], t(TypeName::String), "Input exposed as an environment variable."),
        m("stdin", vec![], Type::Dynamic, "Input forwarded to standard input."),
        mv("tuple", vec![Type::Dynamic], Type::Dynamic, "Composite input of multiple qualifiers."),
        m("each", vec![Type::Dynamic], Type::Dynamic, "Repeat the task for every element."),
    ],
});

static PROCESS_OUTPUTS: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "process outputs",
    members: vec![
        m("val", vec![Type::Dynamic], Type::Dynamic, "Output value."),
        m("path", vec![Type::Dynamic], t(TypeName::Path), "Output file captured from the task directory."),
        dep(
            m("file", vec![Type::Dynamic], t(TypeName::Path), "Output file."),
            "use `path` instead",
        ),
        m("env", vec![Type::Dynamic], t(TypeName::String), "Output read from an environment variable."),
        m("stdout", vec![], t(TypeName::String), "Standard output of the task."),
        m("eval", vec![t(TypeName::String)], Type::Dynamic, "Output of a command run after the task."),
        mv("tuple", vec![Type::Dynamic], Type::Dynamic, "Composite output of multiple qualifiers."),
    ],
});

static OUTPUT_BLOCK: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "output block",
    members: vec![
        m("path", vec![Type::Dynamic], Type::Dynamic, "Publish path for the target."),
        m("mode", vec![t(TypeName::String)], Type::Dynamic, "Publish mode."),
        m("overwrite", vec![t(TypeName::Boolean)], Type::Dynamic, "Overwrite previously published files."),
        m("enabled", vec![t(TypeName::Boolean)], Type::Dynamic, "Enable or disable publishing."),
        m("contentType", vec![t(TypeName::String)], Type::Dynamic, "Content type of published files."),
        m("tags", vec![t(TypeName::Map)], Type::Dynamic, "Tags applied to published files."),
    ],
});

static PROCESS_BODY: Lazy<DslScope> = Lazy::new(|| DslScope {
    name: "process body",
    members: vec![c("task", t(TypeName::Map), "Runtime directives of the current task.")],
});

pub fn global_scope() -> &'static DslScope {
    &GLOBAL_SCOPE
}

pub fn channel_factory() -> &'static DslScope {
    &CHANNEL_FACTORY
}

pub fn process_directives() -> &'static DslScope {
    &PROCESS_DIRECTIVES
}

pub fn process_inputs() -> &'static DslScope {
    &PROCESS_INPUTS
}

pub fn process_outputs() -> &'static DslScope {
    &PROCESS_OUTPUTS
}

pub fn output_block() -> &'static DslScope {
    &OUTPUT_BLOCK
}

pub fn process_body() -> &'static DslScope {
    &PROCESS_BODY
}

/// Resolve a surface by the name recorded in a builtin target.
pub fn scope_by_name(name: &str) -> Option<&'static DslScope> {
    match name {
        "script" => Some(&GLOBAL_SCOPE),
        "Channel" => Some(&CHANNEL_FACTORY),
        "workflow" => Some(&WORKFLOW_METADATA),
        "nextflow" => Some(&NEXTFLOW_METADATA),
        "log" => Some(&LOG_SCOPE),
        "process directives" => Some(&PROCESS_DIRECTIVES),
        "process inputs" => Some(&PROCESS_INPUTS),
        "process outputs" => Some(&PROCESS_OUTPUTS),
        "process body" => Some(&PROCESS_BODY),
        "output block" => Some(&OUTPUT_BLOCK),
        _ => None,
    }
}

/// Resolve a builtin target `{scope, member}` back to its member record.
/// Scopes are either surface names or canonical type names.
pub fn builtin_member(scope: &str, member: &str) -> Option<&'static ClassMember> {
    if let Some(surface) = scope_by_name(scope) {
        return surface.find(member);
    }
    TYPE_MEMBERS
        .iter()
        .find(|(name, _)| name.as_str() == scope)
        .and_then(|(_, members)| members.iter().find(|m| m.name == member))
}

/// Members of a dotted namespace (`Channel.`, `workflow.`, ...).
pub fn namespace(name: &str) -> Option<&'static DslScope> {
    match name {
        "Channel" | "channel" => Some(&CHANNEL_FACTORY),
        "workflow" => Some(&WORKFLOW_METADATA),
        "nextflow" => Some(&NEXTFLOW_METADATA),
        "log" => Some(&LOG_SCOPE),
        _ => None,
    }
}

// -- per-type methods -------------------------------------------------------

static TYPE_MEMBERS: Lazy<HashMap<TypeName, Vec<ClassMember>>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        TypeName::String,
        vec![
            m("size", vec![], t(TypeName::Integer), "Number of characters."),
            m("length", vec![], t(TypeName::Integer), "Number of characters."),
            m("toUpperCase", vec![], t(TypeName::String), "Uppercased copy."),
            m("toLowerCase", vec![], t(TypeName::String), "Lowercased copy."),
            m("trim", vec![], t(TypeName::String), "Copy without surrounding whitespace."),
            m("strip", vec![], t(TypeName::String), "Copy without surrounding whitespace."),
            m("reverse", vec![], t(TypeName::String), "Reversed copy."),
            m(
                "split",
                vec![t(TypeName::String)],
                list_of(t(TypeName::String)),
                "Split around matches of a regular expression.",
            ),
            m(
                "tokenize",
                vec![t(TypeName::String)],
                list_of(t(TypeName::String)),
                "Split on delimiter characters.",
            ),
            m(
                "replaceAll",
                vec![t(TypeName::String), t(TypeName::String)],
                t(TypeName::String),
                "Replace every match of a regular expression.",
            ),
            m(
                "replaceFirst",
                vec![t(TypeName::String), t(TypeName::String)],
                t(TypeName::String),
                "Replace the first match of a regular expression.",
            ),
            m("contains", vec![t(TypeName::String)], t(TypeName::Boolean), "Substring test."),
            m("startsWith", vec![t(TypeName::String)], t(TypeName::Boolean), "Prefix test."),
            m("endsWith", vec![t(TypeName::String)], t(TypeName::Boolean), "Suffix test."),
            m("matches", vec![t(TypeName::String)], t(TypeName::Boolean), "Full regular expression match."),
            m("toInteger", vec![], t(TypeName::Integer), "Parse as an integer."),
            m("toFloat", vec![], t(TypeName::Float), "Parse as a float."),
            m("toBoolean", vec![], t(TypeName::Boolean), "Parse as a boolean."),
            m("isEmpty", vec![], t(TypeName::Boolean), "Whether the string has no characters."),
            m(
                "substring",
                vec![t(TypeName::Integer)],
                t(TypeName::String),
                "Suffix starting at an index.",
            ),
            m("md5", vec![], t(TypeName::String), "MD5 digest of the string."),
        ],
    );

    map.insert(
        TypeName::Integer,
        vec![
            m("abs", vec![], t(TypeName::Integer), "Absolute value."),
            m("toString", vec![], t(TypeName::String), "Decimal rendering."),
            m("toFloat", vec![], t(TypeName::Float), "Widen to a float."),
            m(
                "times",
                vec![func(vec![t(TypeName::Integer)], Type::Dynamic)],
                Type::Dynamic,
                "Run a closure this many times.",
            ),
        ],
    );

    map.insert(
        TypeName::Float,
        vec![
            m("abs", vec![], t(TypeName::Float), "Absolute value."),
            m("round", vec![], t(TypeName::Integer), "Round to the nearest integer."),
            m("toString", vec![], t(TypeName::String), "Decimal rendering."),
            m("toInteger", vec![], t(TypeName::Integer), "Truncate to an integer."),
        ],
    );

    let iterable_members = |item: Type| {
        vec![
            m("size", vec![], t(TypeName::Integer), "Number of elements."),
            m("isEmpty", vec![], t(TypeName::Boolean), "Whether there are no elements."),
            m("first", vec![], item.clone(), "First element."),
            m("last", vec![], item.clone(), "Last element."),
            m("contains", vec![item.clone()], t(TypeName::Boolean), "Membership test."),
            m(
                "each",
                vec![func(vec![item.clone()], Type::Dynamic)],
                Type::Dynamic,
                "Apply a closure to every element.",
            ),
            m(
                "collect",
                vec![func(vec![item.clone()], ph("R"))],
                list_of(ph("R")),
                "Transform every element.",
            ),
            m(
                "find",
                vec![func(vec![item.clone()], t(TypeName::Boolean))],
                item.clone(),
                "First element matching a predicate.",
            ),
            m(
                "findAll",
                vec![func(vec![item.clone()], t(TypeName::Boolean))],
                list_of(item.clone()),
                "All elements matching a predicate.",
            ),
            m(
                "every",
                vec![func(vec![item.clone()], t(TypeName::Boolean))],
                t(TypeName::Boolean),
                "Whether all elements match a predicate.",
            ),
            m(
                "any",
                vec![func(vec![item.clone()], t(TypeName::Boolean))],
                t(TypeName::Boolean),
                "Whether any element matches a predicate.",
            ),
            m("join", vec![t(TypeName::String)], t(TypeName::String), "Concatenate with a separator."),
            m("sort", vec![], list_of(item.clone()), "Sorted copy."),
            m("unique", vec![], list_of(item.clone()), "Copy without duplicates."),
            m("reverse", vec![], list_of(item.clone()), "Reversed copy."),
            m("flatten", vec![], list_of(Type::Dynamic), "Recursively flattened copy."),
            m("sum", vec![], Type::Dynamic, "Sum of the elements."),
            m("min", vec![], item.clone(), "Smallest element."),
            m("max", vec![], item, "Largest element."),
            m("toList", vec![], list_of(ph("E")), "Copy as a list."),
        ]
    };
    map.insert(TypeName::List, iterable_members(ph("E")));
    map.insert(TypeName::Set, iterable_members(ph("E")));
    map.insert(TypeName::Bag, iterable_members(ph("E")));
    map.insert(TypeName::Iterable, iterable_members(ph("E")));

    map.insert(
        TypeName::Map,
        vec![
            m("size", vec![], t(TypeName::Integer), "Number of entries."),
            m("isEmpty", vec![], t(TypeName::Boolean), "Whether there are no entries."),
            m("get", vec![ph("K")], ph("V"), "Value for a key."),
            m("containsKey", vec![ph("K")], t(TypeName::Boolean), "Key membership test."),
            m("containsValue", vec![ph("V")], t(TypeName::Boolean), "Value membership test."),
            m("keySet", vec![], Type::of(TypeName::Set, vec![ph("K")]), "All keys."),
            m("values", vec![], list_of(ph("V")), "All values."),
            m(
                "each",
                vec![func(vec![ph("K"), ph("V")], Type::Dynamic)],
                Type::Dynamic,
                "Apply a closure to every entry.",
            ),
            m(
                "collect",
                vec![func(vec![ph("K"), ph("V")], ph("R"))],
                list_of(ph("R")),
                "Transform every entry.",
            ),
            m(
                "findAll",
                vec![func(vec![ph("K"), ph("V")], t(TypeName::Boolean))],
                t(TypeName::Map),
                "Entries matching a predicate.",
            ),
            m(
                "subMap",
                vec![list_of(ph("K"))],
                t(TypeName::Map),
                "Copy restricted to the given keys.",
            ),
        ],
    );

    map.insert(
        TypeName::Path,
        vec![
            m("getName", vec![], t(TypeName::String), "File name with extension."),
            c("name", t(TypeName::String), "File name with extension."),
            c("baseName", t(TypeName::String), "File name without its last extension."),
            c("simpleName", t(TypeName::String), "File name without any extension."),
            c("extension", t(TypeName::String), "Last file extension."),
            c("parent", t(TypeName::Path), "Parent directory."),
            m("exists", vec![], t(TypeName::Boolean), "Whether the path exists."),
            m("isFile", vec![], t(TypeName::Boolean), "Whether the path is a regular file."),
            m("isDirectory", vec![], t(TypeName::Boolean), "Whether the path is a directory."),
            m("getText", vec![], t(TypeName::String), "Read the whole file as text."),
            c("text", t(TypeName::String), "The whole file as text."),
            m("readLines", vec![], list_of(t(TypeName::String)), "Read the file as a list of lines."),
            m("resolve", vec![t(TypeName::String)], t(TypeName::Path), "Resolve a child path."),
            m("copyTo", vec![t(TypeName::Path)], t(TypeName::Path), "Copy to another location."),
            m("moveTo", vec![t(TypeName::Path)], t(TypeName::Path), "Move to another location."),
            m("mkdirs", vec![], t(TypeName::Boolean), "Create the directory and its parents."),
        ],
    );

    map.insert(
        TypeName::Duration,
        vec![
            m("toMillis", vec![], t(TypeName::Integer), "Duration in milliseconds."),
            m("toSeconds", vec![], t(TypeName::Integer), "Duration in seconds."),
            m("toMinutes", vec![], t(TypeName::Integer), "Duration in minutes."),
            m("toHours", vec![], t(TypeName::Integer), "Duration in hours."),
            m("toDays", vec![], t(TypeName::Integer), "Duration in days."),
        ],
    );

    map.insert(
        TypeName::MemoryUnit,
        vec![
            m("toBytes", vec![], t(TypeName::Integer), "Size in bytes."),
            m("toKilo", vec![], t(TypeName::Float), "Size in kilobytes."),
            m("toMega", vec![], t(TypeName::Float), "Size in megabytes."),
            m("toGiga", vec![], t(TypeName::Float), "Size in gigabytes."),
            m("toUnit", vec![t(TypeName::String)], t(TypeName::Float), "Size in the given unit."),
        ],
    );

    map.insert(TypeName::Channel, channel_operators());

    map.insert(
        TypeName::Value,
        vec![
            c("val", ph("T"), "The value held by the channel."),
            m(
                "map",
                vec![func(vec![ph("T")], ph("R"))],
                value_of(ph("R")),
                "Transform the value.",
            ),
            m("view", vec![], value_of(ph("T")), "Print the value."),
            m(
                "combine",
                vec![Type::Dynamic],
                channel_of(Type::Dynamic),
                "Combine with every emission of another channel.",
            ),
        ],
    );

    map
});

/// The channel operator set. `combine`, `join` and `groupTuple` return
/// shapes are synthesized from operand generics in the type checker; the
/// table carries their fallback signatures.
fn channel_operators() -> Vec<ClassMember> {
    vec![
        m(
            "map",
            vec![func(vec![ph("T")], ph("R"))],
            channel_of(ph("R")),
            "Transform every emission.",
        ),
        m(
            "filter",
            vec![func(vec![ph("T")], t(TypeName::Boolean))],
            channel_of(ph("T")),
            "Keep emissions matching a predicate.",
        ),
        m(
            "flatMap",
            vec![func(vec![ph("T")], Type::Dynamic)],
            channel_of(Type::Dynamic),
            "Transform and flatten every emission.",
        ),
        m("collect", vec![], value_of(list_of(ph("T"))), "Gather all emissions into a list."),
        m("toList", vec![], value_of(list_of(ph("T"))), "Gather all emissions into a list."),
        m(
            "toSortedList",
            vec![],
            value_of(list_of(ph("T"))),
            "Gather all emissions into a sorted list.",
        ),
        m("count", vec![], value_of(t(TypeName::Integer)), "Count the emissions."),
        m("first", vec![], value_of(ph("T")), "First emission."),
        m("last", vec![], value_of(ph("T")), "Last emission."),
        m("take", vec![t(TypeName::Integer)], channel_of(ph("T")), "First n emissions."),
        m("distinct", vec![], channel_of(ph("T")), "Drop consecutive duplicates."),
        m("unique", vec![], channel_of(ph("T")), "Drop duplicate emissions."),
        m("flatten", vec![], channel_of(Type::Dynamic), "Flatten collection emissions."),
        mv("mix", vec![channel_of(ph("T"))], channel_of(ph("T")), "Interleave with other channels."),
        mv(
            "concat",
            vec![channel_of(ph("T"))],
            channel_of(ph("T")),
            "Emit all items of each channel in order.",
        ),
        m("ifEmpty", vec![ph("T")], channel_of(ph("T")), "Fallback emission for an empty channel."),
        m(
            "reduce",
            vec![func(vec![ph("T"), ph("T")], ph("T"))],
            value_of(ph("T")),
            "Fold the emissions.",
        ),
        m(
            "until",
            vec![func(vec![ph("T")], t(TypeName::Boolean))],
            channel_of(ph("T")),
            "Emit until a predicate matches.",
        ),
        m(
            "branch",
            vec![func(vec![ph("T")], Type::Dynamic)],
            Type::Dynamic,
            "Split into named branches.",
        ),
        m(
            "buffer",
            vec![t(TypeName::Integer)],
            channel_of(list_of(ph("T"))),
            "Group emissions into chunks.",
        ),
        m(
            "combine",
            vec![Type::Dynamic],
            channel_of(Type::Dynamic),
            "Cartesian product with another channel.",
        ),
        m(
            "join",
            vec![Type::Dynamic],
            channel_of(Type::Dynamic),
            "Join with another channel on the first tuple element.",
        ),
        m(
            "groupTuple",
            vec![],
            channel_of(Type::Dynamic),
            "Group tuple emissions by their first element.",
        ),
        m("cross", vec![channel_of(Type::Dynamic)], channel_of(Type::Dynamic), "Cross with another channel."),
        dep(
            mv("merge", vec![channel_of(Type::Dynamic)], channel_of(Type::Dynamic), "Pairwise merge."),
            "operator ordering is nondeterministic; use `join` instead",
        ),
        m(
            "set",
            vec![func(vec![], Type::Dynamic)],
            Type::Dynamic,
            "Bind the channel to a new variable name.",
        ),
        m(
            "tap",
            vec![func(vec![], Type::Dynamic)],
            channel_of(ph("T")),
            "Bind a side copy to a new variable name.",
        ),
        m(
            "view",
            vec![func(vec![ph("T")], Type::Dynamic)],
            channel_of(ph("T")),
            "Print every emission.",
        ),
        m(
            "subscribe",
            vec![func(vec![ph("T")], Type::Dynamic)],
            Type::Dynamic,
            "Invoke a closure on every emission.",
        ),
        m(
            "splitCsv",
            vec![],
            channel_of(list_of(t(TypeName::String))),
            "Split text emissions as CSV rows.",
        ),
        m(
            "splitText",
            vec![],
            channel_of(t(TypeName::String)),
            "Split text emissions into lines.",
        ),
        m(
            "collectFile",
            vec![],
            channel_of(t(TypeName::Path)),
            "Collect emissions into files.",
        ),
        m("dump", vec![], channel_of(ph("T")), "Print emissions when -dump-channels is set."),
        m("randomSample", vec![t(TypeName::Integer)], channel_of(ph("T")), "Random subset of emissions."),
    ]
}

pub fn members_of(name: TypeName) -> &'static [ClassMember] {
    TYPE_MEMBERS.get(&name).map(|v| v.as_slice()).unwrap_or(&[])
}

// -- operator classes -------------------------------------------------------

static OPS_CLASSES: Lazy<HashMap<TypeName, Vec<OpMethod>>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        TypeName::Integer,
        vec![
            op("plus", t(TypeName::Integer), t(TypeName::Integer)),
            op("plus", t(TypeName::Float), t(TypeName::Float)),
            op("minus", t(TypeName::Integer), t(TypeName::Integer)),
            op("minus", t(TypeName::Float), t(TypeName::Float)),
            op("multiply", t(TypeName::Integer), t(TypeName::Integer)),
            op("multiply", t(TypeName::Float), t(TypeName::Float)),
            op("div", t(TypeName::Integer), t(TypeName::Float)),
            op("div", t(TypeName::Float), t(TypeName::Float)),
            op("mod", t(TypeName::Integer), t(TypeName::Integer)),
            op("power", t(TypeName::Integer), t(TypeName::Integer)),
            op("power", t(TypeName::Float), t(TypeName::Float)),
            op("leftShift", t(TypeName::Integer), t(TypeName::Integer)),
            op("rightShift", t(TypeName::Integer), t(TypeName::Integer)),
            op("and", t(TypeName::Integer), t(TypeName::Integer)),
            op("or", t(TypeName::Integer), t(TypeName::Integer)),
            op("xor", t(TypeName::Integer), t(TypeName::Integer)),
            op0("negative", t(TypeName::Integer)),
            op0("positive", t(TypeName::Integer)),
            op0("bitwiseNegate", t(TypeName::Integer)),
        ],
    );

    map.insert(
        TypeName::Float,
        vec![
            op("plus", t(TypeName::Float), t(TypeName::Float)),
            op("minus", t(TypeName::Float), t(TypeName::Float)),
            op("multiply", t(TypeName::Float), t(TypeName::Float)),
            op("div", t(TypeName::Float), t(TypeName::Float)),
            op("power", t(TypeName::Float), t(TypeName::Float)),
            op0("negative", t(TypeName::Float)),
            op0("positive", t(TypeName::Float)),
        ],
    );

    map.insert(
        TypeName::String,
        vec![
            op("plus", Type::Dynamic, t(TypeName::String)),
            op("multiply", t(TypeName::Integer), t(TypeName::String)),
            op("minus", t(TypeName::String), t(TypeName::String)),
            op("getAt", t(TypeName::Integer), t(TypeName::String)),
            op("getAt", Type::of(TypeName::List, vec![t(TypeName::Integer)]), t(TypeName::String)),
            // ~'pattern' compiles a regular expression.
            op0("bitwiseNegate", t(TypeName::Regex)),
        ],
    );

    map.insert(
        TypeName::List,
        vec![
            op("plus", list_of(ph("E")), list_of(ph("E"))),
            op("minus", list_of(ph("E")), list_of(ph("E"))),
            op("multiply", t(TypeName::Integer), list_of(ph("E"))),
            op("leftShift", ph("E"), list_of(ph("E"))),
            op("getAt", t(TypeName::Integer), ph("E")),
        ],
    );

    map.insert(
        TypeName::Set,
        vec![
            op("plus", Type::of(TypeName::Set, vec![ph("E")]), Type::of(TypeName::Set, vec![ph("E")])),
            op("minus", Type::of(TypeName::Set, vec![ph("E")]), Type::of(TypeName::Set, vec![ph("E")])),
            op("leftShift", ph("E"), Type::of(TypeName::Set, vec![ph("E")])),
        ],
    );

    map.insert(
        TypeName::Map,
        vec![
            op("plus", t(TypeName::Map), t(TypeName::Map)),
            op("leftShift", t(TypeName::Map), t(TypeName::Map)),
            op("getAt", ph("K"), ph("V")),
        ],
    );

    map.insert(
        TypeName::Duration,
        vec![
            op("plus", t(TypeName::Duration), t(TypeName::Duration)),
            op("minus", t(TypeName::Duration), t(TypeName::Duration)),
            op("multiply", t(TypeName::Integer), t(TypeName::Duration)),
            op("multiply", t(TypeName::Float), t(TypeName::Duration)),
            op("div", t(TypeName::Integer), t(TypeName::Duration)),
        ],
    );

    map.insert(
        TypeName::MemoryUnit,
        vec![
            op("plus", t(TypeName::MemoryUnit), t(TypeName::MemoryUnit)),
            op("minus", t(TypeName::MemoryUnit), t(TypeName::MemoryUnit)),
            op("multiply", t(TypeName::Integer), t(TypeName::MemoryUnit)),
            op("multiply", t(TypeName::Float), t(TypeName::MemoryUnit)),
            op("div", t(TypeName::Integer), t(TypeName::MemoryUnit)),
        ],
    );

    map.insert(
        TypeName::Path,
        vec![
            op("plus", t(TypeName::String), t(TypeName::Path)),
            op("div", t(TypeName::String), t(TypeName::Path)),
        ],
    );

    map.insert(
        TypeName::Boolean,
        vec![
            op("and", t(TypeName::Boolean), t(TypeName::Boolean)),
            op("or", t(TypeName::Boolean), t(TypeName::Boolean)),
            op("xor", t(TypeName::Boolean), t(TypeName::Boolean)),
        ],
    );

    map
});

pub fn ops_of(name: TypeName) -> &'static [OpMethod] {
    OPS_CLASSES.get(&name).map(|v| v.as_slice()).unwrap_or(&[])
}

/// Binary operator symbol → ops-class method name.
pub fn binary_op_method(op: &str) -> Option<&'static str> {
    match op {
        "+" => Some("plus"),
        "-" => Some("minus"),
        "*" => Some("multiply"),
        "/" => Some("div"),
        "%" => Some("mod"),
        "**" => Some("power"),
        "<<" => Some("leftShift"),
        ">>" => Some("rightShift"),
        "&" => Some("and"),
        "^" => Some("xor"),
        _ => None,
    }
}

/// Unary operator symbol → ops-class method name.
pub fn unary_op_method(op: &str) -> Option<&'static str> {
    match op {
        "-" => Some("negative"),
        "+" => Some("positive"),
        "~" => Some("bitwiseNegate"),
        _ => None,
    }
}
