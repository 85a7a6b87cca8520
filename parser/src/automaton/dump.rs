//! Automaton debug dump.
//!
//! Activated via the `ESPALIER_DUMP_AUTOMATON` environment variable:
//! - `ESPALIER_DUMP_AUTOMATON=1` writes to `target/espalier/<goal>.automaton`
//! - `ESPALIER_DUMP_AUTOMATON=<dir>` writes to `<dir>/<goal>.automaton`

use super::ParserStateSet;

/// Write a dump of the (fully built) automaton if the environment asks
/// for one. I/O problems degrade to warnings on stderr.
pub fn dump_if_requested(automaton: &ParserStateSet) {
    let target = match std::env::var("ESPALIER_DUMP_AUTOMATON") {
        Ok(v) if !v.is_empty() => v,
        _ => return,
    };
    automaton.build_all();
    let dir = if target == "1" {
        std::path::PathBuf::from("target/espalier")
    } else {
        std::path::PathBuf::from(target)
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("warning: ESPALIER_DUMP_AUTOMATON: failed to create directory {dir:?}: {e}");
        return;
    }
    let goal_tag = automaton
        .rules()
        .rule(automaton.goal_rule())
        .tag
        .replace(['<', '>', '/'], "");
    let path = dir.join(format!("{goal_tag}.automaton"));
    match std::fs::write(&path, automaton.dump_text()) {
        Ok(()) => eprintln!("info: ESPALIER_DUMP_AUTOMATON: wrote {}", path.display()),
        Err(e) => eprintln!("warning: ESPALIER_DUMP_AUTOMATON: failed to write {path:?}: {e}"),
    }
}
