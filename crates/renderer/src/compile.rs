//! Shader sources and the fragment wrapper.
//!
//! Fragment shaders are written as WebGL2 GLSL ES 3.00 with free uniforms and
//! rewritten into Vulkan GLSL for naga. The rewrite is textual, which puts a
//! few limits on the source:
//!
//! - `resolution`, `time`, `move`, `touch`, `pointerCount` and `pointers` are
//!   macros for block fields, so they cannot name locals, parameters or
//!   functions.
//! - Every `gl_FragCoord` and `main(void)` is rewritten, including those inside
//!   comments.
//! - `uniform` declarations are recognised per `;`-terminated statement and
//!   must not span lines.
//! - Only `out` declarations starting a statement get `location = 0`.

use std::fmt;

use wgpu::naga;

use crate::gpu::MAX_POINTERS;
use crate::types::{ShaderDiagnostic, ShaderStage};

/// Built-in nebula fragment shader, swapped in once the fallback is live.
pub const DEFAULT_FRAGMENT_SHADER: &str = include_str!("../shaders/nebula.frag");

/// Minimal known-good shader linked first so the surface always has a program
/// before any heavier candidate is validated and swapped in.
pub const FALLBACK_FRAGMENT_SHADER: &str = r"#version 300 es
precision highp float;
uniform vec2 resolution;
uniform float time;
out vec4 fragColor;

void main(void) {
    vec2 uv = gl_FragCoord.xy / resolution;
    fragColor = vec4(0.04 + 0.06 * uv.x, 0.03, 0.10 + 0.08 * uv.y + 0.02 * sin(time), 1.0);
}
";

/// Fixed vertex stage: passes the full-screen quad straight through to clip space.
pub const VERTEX_SHADER: &str = r"#version 450
layout(location = 0) in vec2 position;

void main() {
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Uniform names every fragment shader may declare. The wrapper replaces their
/// declarations with fields of a single std140 block.
pub(crate) const CONTRACT_UNIFORMS: [&str; 6] = [
    "resolution",
    "time",
    "move",
    "touch",
    "pointerCount",
    "pointers",
];

/// Checks a fragment shader against the uniform contract without touching a GPU.
pub fn validate_fragment(source: &str) -> Result<(), ShaderDiagnostic> {
    check_wrapped_fragment(&wrap_fragment(source))
}

/// Parses and validates a standalone stage with naga's GLSL frontend.
pub(crate) fn check_stage(stage: ShaderStage, source: &str) -> Result<(), ShaderDiagnostic> {
    check_source(stage, source, 0)
}

/// Like [`check_stage`] for output of [`wrap_fragment`]; reported line numbers
/// refer to the author's source rather than the wrapped text.
pub(crate) fn check_wrapped_fragment(wrapped: &str) -> Result<(), ShaderDiagnostic> {
    check_source(ShaderStage::Fragment, wrapped, prologue_lines())
}

fn check_source(
    stage: ShaderStage,
    source: &str,
    line_offset: usize,
) -> Result<(), ShaderDiagnostic> {
    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let locate = SourceLines::new(source, line_offset, stage);

    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&naga::front::glsl::Options::from(naga_stage), source)
        .map_err(|errors| {
            let message = errors
                .errors
                .iter()
                .map(|error| locate.describe(&error.kind, error.meta))
                .collect::<Vec<_>>()
                .join("\n");
            ShaderDiagnostic::new(stage, message)
        })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| {
        let span = err
            .spans()
            .map(|(span, _)| *span)
            .find(naga::Span::is_defined)
            .unwrap_or_default();
        let message = locate.describe(&error_chain(err.as_inner()), span);
        ShaderDiagnostic::new(stage, message)
    })?;
    Ok(())
}

/// Maps naga spans in a (possibly wrapped) source back to author line numbers.
struct SourceLines<'a> {
    source: &'a str,
    line_offset: usize,
    author_lines: usize,
}

impl<'a> SourceLines<'a> {
    fn new(source: &'a str, line_offset: usize, stage: ShaderStage) -> Self {
        let footer_lines = match (stage, line_offset) {
            (ShaderStage::Fragment, offset) if offset > 0 => FOOTER.lines().count(),
            _ => 0,
        };
        let author_lines = source
            .lines()
            .count()
            .saturating_sub(line_offset + footer_lines);
        Self {
            source,
            line_offset,
            author_lines,
        }
    }

    fn describe(&self, message: &dyn fmt::Display, span: naga::Span) -> String {
        if !span.is_defined() {
            return message.to_string();
        }
        let location = span.location(self.source);
        let line = (location.line_number as usize)
            .checked_sub(self.line_offset)
            .filter(|line| (1..=self.author_lines).contains(line));
        match line {
            Some(line) => format!("line {line}:{}: {message}", location.line_position),
            None => message.to_string(),
        }
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Produces Vulkan-flavoured GLSL from a WebGL2-style fragment shader.
///
/// Steps performed:
///
/// 1. Blank out the `#version` directive and `precision` statements, and drop
///    the contract uniforms from `uniform` declarations. Other statements on
///    the same line survive, and every line keeps its place so diagnostics can
///    be mapped back by [`check_wrapped_fragment`].
/// 2. Turn any other non-opaque `uniform` into a plain global. Nothing writes
///    it, so it reads as zero just like an unset WebGL uniform.
/// 3. Give the colour output an explicit `location = 0`.
/// 4. Route `gl_FragCoord` reads through a global the footer fills in.
/// 5. Prepend a header that declares the uniform block and maps the contract
///    names onto it, and append a footer whose `main` remaps `gl_FragCoord` to
///    a bottom-left origin before calling the author's `main`.
pub(crate) fn wrap_fragment(source: &str) -> String {
    let mut sanitized = String::with_capacity(source.len() + 64);
    let mut skipped_version = false;
    for line in source.lines() {
        let trimmed = line.trim_start();
        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            sanitized.push('\n');
            continue;
        }

        let line = if trimmed.starts_with('#') {
            line.to_string()
        } else {
            sanitize_statements(line)
        };
        let trimmed = line.trim_start();
        if trimmed.starts_with("out ") && !trimmed.contains("layout") {
            sanitized.push_str("layout(location = 0) ");
            sanitized.push_str(trimmed);
        } else {
            sanitized.push_str(
                &line
                    .replace("main(void)", "main()")
                    .replace("gl_FragCoord", "hero_frag_coord"),
            );
        }
        sanitized.push('\n');
    }

    format!("{header}\n{sanitized}{FOOTER}", header = header())
}

/// Lines the wrapper places ahead of the author's first line.
fn prologue_lines() -> usize {
    header().lines().count() + 1
}

/// Rewrites the `;`-terminated statements of one line, dropping `precision`
/// statements and contract uniform declarations.
fn sanitize_statements(line: &str) -> String {
    let mut kept = String::with_capacity(line.len());
    for statement in line.split_inclusive(';') {
        let trimmed = statement.trim_start();
        if trimmed.starts_with("precision ") {
            continue;
        }
        if trimmed.starts_with("uniform ") && statement.trim_end().ends_with(';') {
            if let Some(rewritten) = rewrite_uniform(trimmed) {
                kept.push_str(&statement[..statement.len() - trimmed.len()]);
                kept.push_str(&rewritten);
            }
            continue;
        }
        kept.push_str(statement);
    }
    kept
}

/// Rewrites one `uniform ...;` statement. Returns `None` when every declarator
/// is a contract uniform.
fn rewrite_uniform(statement: &str) -> Option<String> {
    let body = statement.trim_end().trim_end_matches(';');
    let mut declarators = body.split(',');
    let first = declarators.next().unwrap_or_default().trim_end();
    let Some((qualifiers, first_name)) = first.rsplit_once(char::is_whitespace) else {
        return Some(statement.to_string());
    };

    let kept: Vec<&str> = std::iter::once(first_name)
        .chain(declarators.map(str::trim))
        .filter(|declarator| !CONTRACT_UNIFORMS.contains(&declarator_name(declarator)))
        .collect();
    if kept.is_empty() {
        return None;
    }

    let qualifiers = qualifiers.trim_end();
    let is_opaque = qualifiers
        .split_whitespace()
        .any(|word| word.contains("sampler") || word.contains("image"));
    let qualifiers = if is_opaque {
        qualifiers
    } else {
        qualifiers.trim_start_matches("uniform").trim_start()
    };
    Some(format!("{qualifiers} {};", kept.join(", ")))
}

fn declarator_name(declarator: &str) -> &str {
    declarator
        .split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .next()
        .unwrap_or_default()
}

/// GLSL prologue injected ahead of every fragment shader.
///
/// The block layout must match [`crate::gpu::FrameUniforms`].
fn header() -> String {
    format!(
        r"#version 450
layout(std140, set = 0, binding = 0) uniform HeroUniforms {{
    vec2 u_resolution;
    float u_time;
    int u_pointer_count;
    vec2 u_move;
    vec2 u_touch;
    vec2 u_pointers[{MAX_POINTERS}];
}} hero;

#define resolution hero.u_resolution
#define time hero.u_time
#define pointerCount hero.u_pointer_count
#define move hero.u_move
#define touch hero.u_touch
#define pointers hero.u_pointers

vec4 hero_frag_coord;
#define main hero_user_main
"
    )
}

const FOOTER: &str = r"
#undef main
void main() {
    hero_frag_coord = vec4(gl_FragCoord.x, resolution.y - gl_FragCoord.y, gl_FragCoord.z, gl_FragCoord.w);
    hero_user_main();
}
";
