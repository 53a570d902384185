//! Documentation Renderer (C6): a pure `(Source, name) -> String` function
//! producing a reproducibility-oriented, human-readable description of any
//! `Source`. Used verbatim by the excluded backend layer in RPM `%prep`/
//! `%description` sections.

use std::fmt::Write as _;

use crate::source::{Command, Source, SourceVariant};

/// Renders `source` (named `name` in the enclosing spec) as a
/// reproducibility record.
pub fn render(source: &Source, name: &str) -> String {
    let mut out = String::new();
    render_into(&mut out, source, name, 0);
    out
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn render_into(out: &mut String, source: &Source, name: &str, depth: usize) {
    let pad = indent(depth);
    match &source.variant {
        SourceVariant::DockerImage(s) => {
            let _ = writeln!(out, "{pad}source \"{name}\" (docker image)");
            let _ = writeln!(out, "{pad}  ref: {}", s.reference);
            if let Some(cmd) = &s.cmd {
                render_command(out, cmd, depth + 1);
            }
        }
        SourceVariant::Git(s) => {
            let _ = writeln!(out, "{pad}source \"{name}\" (git)");
            let _ = writeln!(out, "{pad}  url: {}", s.url);
            let _ = writeln!(out, "{pad}  commit: {}", s.commit);
            if s.keep_git_dir {
                let _ = writeln!(out, "{pad}  keepGitDir: true");
            }
        }
        SourceVariant::Http(s) => {
            let _ = writeln!(out, "{pad}source \"{name}\" (http)");
            let _ = writeln!(out, "{pad}  url: {}", s.url);
        }
        SourceVariant::Context(s) => {
            let _ = writeln!(out, "{pad}source \"{name}\" (context)");
            let _ = writeln!(out, "{pad}  name: {}", s.name_or_default());
        }
        SourceVariant::Build(s) => {
            let _ = writeln!(out, "{pad}source \"{name}\" (build)");
            if let Some(target) = &s.target {
                let _ = writeln!(out, "{pad}  target: {target}");
            }
            if !s.args.is_empty() {
                let _ = writeln!(out, "{pad}  args:");
                for (k, v) in &s.args {
                    let _ = writeln!(out, "{pad}    {k}={v}");
                }
            }
            if let Some(inline) = &s.inline {
                let _ = writeln!(out, "{pad}  dockerfile (inline):");
                for line in inline.lines() {
                    let _ = writeln!(out, "{pad}    {line}");
                }
            } else if let Some(file) = &s.file {
                let _ = writeln!(out, "{pad}  dockerfile: {file}");
            }
            render_into(out, &s.source, "build context", depth + 1);
        }
        SourceVariant::Inline(s) => {
            let _ = writeln!(out, "{pad}source \"{name}\" (inline)");
            if let Some(file) = &s.file {
                let _ = writeln!(out, "{pad}  file, {} bytes", file.contents.len());
            }
            if let Some(dir) = &s.dir {
                let _ = writeln!(out, "{pad}  dir, {} files:", dir.files.len());
                for child_name in dir.files.keys() {
                    let _ = writeln!(out, "{pad}    {child_name}");
                }
            }
        }
    }

    if !source.common.path.is_empty() {
        let _ = writeln!(out, "{pad}  path: {}", source.common.path);
    }
    if !source.common.includes.is_empty() {
        let mut includes = source.common.includes.clone();
        includes.sort();
        let _ = writeln!(out, "{pad}  includes: {}", includes.join(", "));
    }
    if !source.common.excludes.is_empty() {
        let mut excludes = source.common.excludes.clone();
        excludes.sort();
        let _ = writeln!(out, "{pad}  excludes: {}", excludes.join(", "));
    }
}

fn render_command(out: &mut String, cmd: &Command, depth: usize) {
    let pad = indent(depth);
    let _ = writeln!(out, "{pad}command:");
    if !cmd.dir.is_empty() {
        let _ = writeln!(out, "{pad}  dir: {}", cmd.dir);
    }
    if !cmd.env.is_empty() {
        let _ = writeln!(out, "{pad}  env:");
        for (k, v) in &cmd.env {
            let _ = writeln!(out, "{pad}    {k}={v}");
        }
    }
    for (i, step) in cmd.steps.iter().enumerate() {
        let _ = writeln!(out, "{pad}  step {}: {}", i + 1, step.command);
        if !step.env.is_empty() {
            let _ = writeln!(out, "{pad}    env:");
            for (k, v) in &step.env {
                let _ = writeln!(out, "{pad}      {k}={v}");
            }
        }
    }
    for mount in &cmd.mounts {
        let _ = writeln!(out, "{pad}  mount {}:", mount.dest);
        render_into(out, &mount.spec, &mount.dest, depth + 2);
    }
}
