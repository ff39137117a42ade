use crate::error::{ReferenceError, Result};
use crate::sidecar::sidecar_path;
use crate::types::{Guid, Identifier, ReferenceList};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([fF]ileID|guid): ([\-a-z0-9]+)")
        .unwrap_or_else(|err| unreachable!("token pattern is valid: {err}"))
});

/// Maximum gap between two tokens that still belong to the same reference.
const MERGE_WINDOW: usize = 3;

/// Document extensions that carry a textual reference table.
pub const REFERENCE_EXTENSIONS: &[&str] = &["mat", "prefab", "unity", "asset"];

/// True when files with this path's extension are scanned for references.
pub fn has_reference_table(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| REFERENCE_EXTENSIONS.contains(&ext))
}

enum Label {
    Guid,
    LocalId,
}

struct Token<'t> {
    label: Label,
    value: &'t str,
    start: usize,
    end: usize,
}

fn tokens(text: &str) -> impl Iterator<Item = Token<'_>> {
    TOKEN_PATTERN.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let label = if &caps[1] == "guid" {
            Label::Guid
        } else {
            Label::LocalId
        };
        Some(Token {
            label,
            value: caps.get(2)?.as_str(),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

fn assign(id: &mut Identifier, token: &Token<'_>) {
    match token.label {
        Label::Guid => id.guid = Some(Guid::new(token.value)),
        Label::LocalId => id.local_id = Some(token.value.to_string()),
    }
}

/// Identity of a sidecar text: the last `guid` and the last `fileID` win.
pub fn read_identity(text: &str) -> Identifier {
    let mut id = Identifier::default();
    for token in tokens(text) {
        assign(&mut id, &token);
    }
    id
}

/// All references of a document, in order.
///
/// A token that starts within [`MERGE_WINDOW`] characters of the previous token's end is folded
/// into the previous reference, so `{fileID: 100, guid: abc, type: 2}` yields one identifier.
pub fn read_references(text: &str) -> ReferenceList {
    let mut references = ReferenceList::new();
    let mut last_end: Option<usize> = None;

    for token in tokens(text) {
        let adjacent = last_end.is_some_and(|end| token.start.saturating_sub(end) <= MERGE_WINDOW);
        match references.last_mut() {
            Some(previous) if adjacent => assign(previous, &token),
            _ => {
                let mut id = Identifier::default();
                assign(&mut id, &token);
                references.push(id);
            }
        }
        last_end = Some(token.end);
    }

    references
}

/// Reads the identity of an asset from its sidecar (`path` may be the asset or the sidecar).
pub async fn read_identity_file(path: &Path) -> Result<Identifier> {
    let sidecar = sidecar_path(path);
    let bytes = tokio::fs::read(&sidecar)
        .await
        .map_err(|err| ReferenceError::io(&sidecar, err))?;
    Ok(read_identity(&String::from_utf8_lossy(&bytes)))
}

/// Reads the references of a document; other extensions yield an empty list without I/O.
pub async fn read_references_file(path: &Path) -> Result<ReferenceList> {
    if !has_reference_table(path) {
        return Ok(ReferenceList::new());
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| ReferenceError::io(path, err))?;
    let references = read_references(&String::from_utf8_lossy(&bytes));
    log::trace!("{} references in {}", references.len(), path.display());
    Ok(references)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WOOD: &str = "5f34a1c9b2e84d1f9a0b3c4d5e6f7a8b";

    fn id(local: Option<&str>, guid: Option<&str>) -> Identifier {
        Identifier {
            local_id: local.map(str::to_string),
            guid: guid.map(Guid::new),
        }
    }

    #[test]
    fn identity_takes_last_occurrence() {
        let text = "fileFormatVersion: 2\nguid: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\nfileID: 1\nguid: bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\nFileID: 7\n";
        assert_eq!(
            read_identity(text),
            id(Some("7"), Some("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"))
        );
    }

    #[test]
    fn identity_without_tokens_is_empty() {
        assert!(read_identity("fileFormatVersion: 2\n").is_empty());
    }

    #[test]
    fn adjacent_tokens_merge_into_one_reference() {
        let text = format!("  m_Texture: {{fileID: 2100000, guid: {WOOD}, type: 2}}\n");
        assert_eq!(read_references(&text), vec![id(Some("2100000"), Some(WOOD))]);
    }

    #[test]
    fn distant_tokens_start_new_references() {
        let text = format!(
            "m_Shader: {{fileID: 46, guid: 0000000000000000f000000000000000, type: 0}}\n\
             m_Parent: {{fileID: 0}}\n\
             m_Tex: {{fileID: 2800000, guid: {WOOD}, type: 3}}\n"
        );
        assert_eq!(
            read_references(&text),
            vec![
                id(Some("46"), Some("0000000000000000f000000000000000")),
                id(Some("0"), None),
                id(Some("2800000"), Some(WOOD)),
            ]
        );
    }

    #[test]
    fn duplicates_are_preserved_in_order() {
        let text = format!("a: {{fileID: 1, guid: {WOOD}}}\nb: {{fileID: 1, guid: {WOOD}}}\n");
        let refs = read_references(&text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], refs[1]);
    }

    #[test]
    fn merge_window_boundary() {
        // Three characters between tokens still merge, four do not.
        let merged = format!("fileID: 5 , guid: {WOOD}");
        assert_eq!(read_references(&merged).len(), 1);
        let split = format!("fileID: 5 ,  guid: {WOOD}");
        assert_eq!(read_references(&split).len(), 2);
    }

    #[test]
    fn negative_local_ids_are_accepted() {
        let text = "m_Obj: {fileID: -4216859302048453862}";
        assert_eq!(
            read_references(text),
            vec![id(Some("-4216859302048453862"), None)]
        );
    }

    #[test]
    fn allow_list_is_extension_based() {
        assert!(has_reference_table(Path::new("floor.mat")));
        assert!(has_reference_table(Path::new("Scenes/Main.unity")));
        assert!(!has_reference_table(Path::new("wood.png")));
        assert!(!has_reference_table(Path::new("wood.png.meta")));
        assert!(!has_reference_table(Path::new("Player.cs")));
    }
}
