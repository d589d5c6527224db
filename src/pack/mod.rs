//! Byte-budgeted context pack assembly.
//!
//! The pack is a markdown digest: a header describing the selection, one
//! entry per file (metadata, top complexity warning, leading symbols) and a
//! static trailer. Every byte of input that influences the output is an
//! explicit argument, so identical inputs render identical bytes.

pub mod budget;

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

use crate::config::ProjectConfig;
use crate::index::FileIndex;
use crate::index::complexity::ComplexityReport;
use crate::index::store::load_index;
use crate::scope::Scope;

use budget::BudgetedLines;

/// Timestamp layout used in the header and per-file entries.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything describing *how* to render a pack, apart from the file list.
#[derive(Debug, Clone)]
pub struct PackRequest {
    pub project_name: String,
    pub generated_at: DateTime<Local>,
    /// The scope that actually produced the file list (after any fallback).
    pub scope: Scope,
    /// The user-supplied path for `scope=path`.
    pub scope_path: Option<String>,
    pub max_bytes: usize,
    pub symbols_per_file: usize,
}

/// Read-only metadata consulted while rendering file entries.
#[derive(Debug, Default)]
pub struct PackMetadata {
    pub index: FileIndex,
    pub complexity: ComplexityReport,
}

/// Load the index and complexity report configured for `root`.
pub fn load_metadata(root: &Path, config: &ProjectConfig) -> PackMetadata {
    PackMetadata {
        index: load_index(&root.join(&config.index_path)),
        complexity: ComplexityReport::load(&root.join(&config.complexity_report)),
    }
}

/// Render the pack for `files`, in the given order, within `request.max_bytes`.
pub fn build_pack(files: &[String], metadata: &PackMetadata, request: &PackRequest) -> String {
    let mut doc = BudgetedLines::new(request.max_bytes);

    doc.push("# PACK");
    doc.push("");
    doc.push(format!("- Project: `{}`", request.project_name));
    doc.push(format!(
        "- Generated: `{}`",
        request.generated_at.format(TIMESTAMP_FORMAT)
    ));
    doc.push(format!("- Scope: `{}` ({} files)", request.scope, files.len()));
    if request.scope == Scope::Path
        && let Some(path) = &request.scope_path
    {
        doc.push(format!("- Path: `{path}`"));
    }
    doc.push("");

    doc.push("## Files");
    for rel in files {
        let (loc, mtime) = match metadata.index.read(rel) {
            Some(record) => (record.line_count, format_mtime(record.mtime_secs)),
            None => (0, None),
        };
        let mtime = mtime.unwrap_or_else(|| "n/a".to_string());
        if !doc.push(format!("- `{rel}` (loc={loc}, mtime={mtime})")) {
            break;
        }

        if let Some(w) = metadata.complexity.top_warning(rel) {
            doc.push(format!(
                "  - complexity: {} (lines={}, nesting={}, params={})",
                w.name.trim(),
                w.lines,
                w.nesting,
                w.params
            ));
        }

        let symbols = metadata.index.symbols(rel, request.symbols_per_file);
        if !symbols.is_empty() {
            let parts: Vec<String> = symbols
                .iter()
                .map(|s| format!("{} @L{}", s.label(), s.line))
                .collect();
            doc.push(format!("  - symbols: {}", parts.join(" | ")));
        }
    }

    doc.push("");
    doc.push("## Commands");
    doc.push("- Refresh and pack staged files: `ctxpack pack --scope staged --refresh-index`");
    doc.push("- Pack a directory: `ctxpack pack --scope path --path <dir>`");
    doc.push("- Keep the index fresh: `ctxpack watch`");
    doc.push("");
    doc.push("## Notes");
    doc.push("- Entries follow scope order; `... (truncated)` means the byte budget was reached.");

    if doc.is_truncated() {
        debug!("pack truncated at {} of {} bytes", doc.used(), request.max_bytes);
    }
    doc.finish()
}

/// Format an mtime, or None when it is unknown (zero or out of range).
fn format_mtime(secs: i64) -> Option<String> {
    if secs <= 0 {
        return None;
    }
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
}

/// Write the pack atomically: readers see either the old file or the whole new one.
pub fn write_pack(path: &Path, text: &str) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::complexity::ComplexityWarning;
    use crate::index::{FileRecord, SymbolRecord};
    use budget::TRUNCATION_MARKER;

    fn fixed_time() -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000, 0).single().unwrap()
    }

    fn request(scope: Scope, max_bytes: usize) -> PackRequest {
        PackRequest {
            project_name: "demo".into(),
            generated_at: fixed_time(),
            scope,
            scope_path: None,
            max_bytes,
            symbols_per_file: 5,
        }
    }

    fn metadata(file_count: usize, symbols_per_file: usize) -> (Vec<String>, PackMetadata) {
        let mut index = FileIndex::new();
        let mut files = Vec::new();
        for i in 0..file_count {
            let path = format!("src/module_{i:02}.rs");
            let symbols = (0..symbols_per_file)
                .map(|s| SymbolRecord {
                    name: format!("symbol_{s}"),
                    line: s * 10 + 1,
                    kind: "fn".into(),
                    signature: Some(format!("pub fn symbol_{s}(input: &str) -> Result<String>")),
                    exported: s % 2 == 0,
                })
                .collect();
            index.upsert(FileRecord {
                path: path.clone(),
                line_count: 100 + i,
                mtime_secs: 1_700_000_000 + i as i64,
                size: 4096,
                symbols,
            });
            files.push(path);
        }
        let complexity = ComplexityReport::from_rows(vec![ComplexityWarning {
            file: "src/module_00.rs".into(),
            name: "parse_everything".into(),
            lines: 120,
            nesting: 6,
            params: 4,
            score: 9,
        }]);
        (files, PackMetadata { index, complexity })
    }

    fn strip_marker(text: &str) -> String {
        text.strip_suffix(&format!("{TRUNCATION_MARKER}\n"))
            .unwrap_or(text)
            .to_string()
    }

    #[test]
    fn test_full_pack_layout() {
        let (files, meta) = metadata(1, 2);
        let text = build_pack(&files, &meta, &request(Scope::Staged, 64 * 1024));

        assert!(text.starts_with("# PACK\n\n- Project: `demo`\n"));
        assert!(text.contains("- Scope: `staged` (1 files)\n\n## Files\n"));
        assert!(text.contains("- `src/module_00.rs` (loc=100, mtime="));
        assert!(
            text.contains("  - complexity: parse_everything (lines=120, nesting=6, params=4)\n")
        );
        assert!(text.contains(
            "  - symbols: pub fn symbol_0(input: &str) -> Result<String> @L1 | pub fn symbol_1(input: &str) -> Result<String> @L11\n"
        ));
        assert!(text.ends_with("byte budget was reached.\n"));
        assert!(!text.contains(TRUNCATION_MARKER));
        assert!(!text.contains("- Path:"));
    }

    #[test]
    fn test_unknown_file_uses_sentinels() {
        let meta = PackMetadata::default();
        let text = build_pack(&["docs/new.md".to_string()], &meta, &request(Scope::Changed, 8192));
        assert!(text.contains("- `docs/new.md` (loc=0, mtime=n/a)\n"));
        assert!(!text.contains("  - symbols:"));
        assert!(!text.contains("  - complexity:"));
    }

    #[test]
    fn test_path_scope_emits_path_line() {
        let meta = PackMetadata::default();
        let mut req = request(Scope::Path, 8192);
        req.scope_path = Some("src/".into());
        let text = build_pack(&["src/a.rs".to_string()], &meta, &req);
        assert!(text.contains("- Scope: `path` (1 files)\n- Path: `src/`\n"));
    }

    #[test]
    fn test_symbols_limited_per_file() {
        let (files, meta) = metadata(1, 8);
        let mut req = request(Scope::Recent, 64 * 1024);
        req.symbols_per_file = 2;
        let text = build_pack(&files, &meta, &req);
        let line = text
            .lines()
            .find(|l| l.starts_with("  - symbols:"))
            .unwrap();
        assert_eq!(line.matches(" @L").count(), 2);
        // Exported (even-numbered) symbols come first.
        assert!(line.contains("symbol_0(") && line.contains("symbol_2("));
    }

    #[test]
    fn test_output_is_deterministic() {
        let (files, meta) = metadata(20, 6);
        let req = request(Scope::Recent, 4096);
        assert_eq!(build_pack(&files, &meta, &req), build_pack(&files, &meta, &req));
    }

    #[test]
    fn test_output_never_exceeds_budget() {
        let (files, meta) = metadata(30, 6);
        for budget in [0, 1, 2, 17, 64, 100, 257, 1000, 1024, 3000, 5000, 1 << 20] {
            let text = build_pack(&files, &meta, &request(Scope::Recent, budget));
            assert!(
                text.len() <= budget,
                "budget {budget} exceeded: {} bytes",
                text.len()
            );
        }
    }

    #[test]
    fn test_truncated_output_is_prefix_of_unbounded_output() {
        let (files, meta) = metadata(30, 6);
        let full = build_pack(&files, &meta, &request(Scope::Recent, usize::MAX));
        for budget in [40, 300, 1024, 2048, 4096] {
            let text = build_pack(&files, &meta, &request(Scope::Recent, budget));
            let body = strip_marker(&text);
            assert!(
                full.starts_with(&body),
                "budget {budget}: output is not a prefix of the unbounded pack"
            );
        }
    }

    #[test]
    fn test_recent_pack_with_tight_budget_is_truncated() {
        let (files, meta) = metadata(50, 12);
        let text = build_pack(&files, &meta, &request(Scope::Recent, 1024));

        assert!(text.len() <= 1024);
        assert!(text.starts_with("# PACK\n"));
        assert!(text.contains("- `src/module_00.rs`"));
        assert!(!text.contains("- `src/module_49.rs`"));
        assert!(text.ends_with(&format!("\n{TRUNCATION_MARKER}\n")));
        assert!(!text.contains("## Commands"));
    }

    #[test]
    fn test_write_pack_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("PACK.md");
        write_pack(&out, "# PACK\n").unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# PACK\n");
    }
}
