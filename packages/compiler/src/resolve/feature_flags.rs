//! Feature Flag Registry
//!
//! The enumerated set of `nextflow.enable.*` / `nextflow.preview.*`
//! declarations a script may carry. Unknown flags are errors, deprecated
//! flags produce future warnings.

pub struct FeatureFlag {
    pub name: &'static str,
    pub doc: &'static str,
    pub deprecated: Option<&'static str>,
}

pub const FEATURE_FLAGS: &[FeatureFlag] = &[
    FeatureFlag {
        name: "nextflow.enable.dsl",
        doc: "Select the DSL version of the script.",
        deprecated: Some("DSL2 is the default; the flag has no effect"),
    },
    FeatureFlag {
        name: "nextflow.enable.strict",
        doc: "Enable strict evaluation of scripts and configs.",
        deprecated: None,
    },
    FeatureFlag {
        name: "nextflow.enable.moduleBinaries",
        doc: "Expose module bin directories to tasks.",
        deprecated: None,
    },
    FeatureFlag {
        name: "nextflow.enable.configProcessNamesValidation",
        doc: "Warn about config process selectors matching no process.",
        deprecated: None,
    },
    FeatureFlag {
        name: "nextflow.preview.output",
        doc: "Enable the workflow output definition.",
        deprecated: None,
    },
    FeatureFlag {
        name: "nextflow.preview.recursion",
        doc: "Enable process and workflow recursion.",
        deprecated: None,
    },
    FeatureFlag {
        name: "nextflow.preview.topic",
        doc: "Enable topic channels.",
        deprecated: None,
    },
];

pub fn find(name: &str) -> Option<&'static FeatureFlag> {
    FEATURE_FLAGS.iter().find(|f| f.name == name)
}
