//! Formatter Tests
//!
//! The printer is a pure function of the AST, so formatting an already
//! formatted file must be a fixed point.

#[cfg(test)]
mod tests {
    use nextflow_compiler::script::formatter::{FormatOptions, Formatter};
    use nextflow_compiler::script::parser::Parser;

    fn format(text: &str, options: FormatOptions) -> String {
        let result = Parser::new().parse(text);
        assert!(result.errors.is_empty(), "fixture must parse: {:?}", result.errors);
        Formatter::new(options).format_script(&result.module)
    }

    fn assert_idempotent(text: &str, options: FormatOptions) {
        let once = format(text, options);
        let twice = format(&once, options);
        assert_eq!(once, twice, "formatting must be a fixed point");
    }

    #[test]
    fn should_format_simple_statements() {
        let out = format("def x=1\nprintln x\n", FormatOptions::default());
        assert_eq!(out, "def x = 1\nprintln x\n");
    }

    #[test]
    fn should_be_idempotent_on_plain_scripts() {
        assert_idempotent("def x = 1\nprintln x\n", FormatOptions::default());
    }

    #[test]
    fn should_format_processes_with_sections() {
        let out = format(
            "process P {\ncpus 4\ninput:\nval x\noutput:\npath 'out.txt'\nscript:\n\"run ${x}\"\n}\n",
            FormatOptions::default(),
        );
        assert!(out.contains("process P {"));
        assert!(out.contains("    input:"));
        assert!(out.contains("    val x"));
        assert!(out.contains("    script:"));
        assert_idempotent(&out, FormatOptions::default());
    }

    #[test]
    fn should_format_workflows_with_sections() {
        let out = format(
            "workflow W {\ntake:\nsamples\nmain:\ndef n = samples\nemit:\nn\n}\n",
            FormatOptions::default(),
        );
        assert!(out.contains("take:"));
        assert!(out.contains("emit:"));
        assert_idempotent(&out, FormatOptions::default());
    }

    #[test]
    fn should_format_includes_on_one_line() {
        let out = format(
            "include { FOO; BAR as BAZ } from './mods'\n",
            FormatOptions::default(),
        );
        assert_eq!(out, "include { FOO ; BAR as BAZ } from './mods'\n");
        assert_idempotent(&out, FormatOptions::default());
    }

    #[test]
    fn should_align_consecutive_assignments_with_harshil_alignment() {
        let options = FormatOptions { harshil_alignment: true, mahesh_form: false };
        let out = format("workflow {\na = 1\nlonger = 2\n}\n", options);
        assert!(out.contains("a      = 1"), "got:\n{}", out);
        assert!(out.contains("longer = 2"));
        assert_idempotent(&out, options);
    }

    #[test]
    fn should_break_pipe_chains_with_mahesh_form() {
        let options = FormatOptions { harshil_alignment: false, mahesh_form: true };
        let out = format("workflow {\nch | view\n}\n", options);
        assert!(out.contains("| view"), "got:\n{}", out);
        assert_idempotent(&out, options);
    }

    #[test]
    fn should_preserve_string_kinds() {
        let out = format("def a = 'single'\ndef b = \"double\"\n", FormatOptions::default());
        assert!(out.contains("'single'"));
        assert!(out.contains("\"double\""));
    }
}
