//src/formats/lineage_text.rs

use std::io::BufRead;
use std::path::Path;

use crate::error::Result;
use crate::formats::data_lines;
use crate::rank_abbr::RankAbbreviations;
use crate::taxdb::{TaxonStore, ROOT_ID};

/// Splits `abbr__name`. The abbreviation is non-empty and has no underscore;
/// the name may be empty (`g__`) and may itself contain underscores.
pub fn split_token(token: &str) -> Option<(&str, &str)> {
    let cut = token.find('_')?;
    if cut == 0 {
        return None;
    }
    let name = token[cut..].strip_prefix("__")?;
    Some((&token[..cut], name))
}

/// Name given to an empty lineage slot, derived from the taxon below it.
pub fn placeholder_name(child: &str, abbr: &str) -> String {
    format!("{child} - no_{abbr}_rank")
}

/// Inserts one lineage, given general to specific as `(abbr, name)` pairs.
///
/// Names double as ids, except for the last token when `leaf_id` is set.
/// Empty names become placeholders named after the nearest named descendant,
/// and the first token hangs off root. Returns the number of taxa inserted.
pub(crate) fn insert_lineage(
    store: &mut TaxonStore,
    tokens: &[(&str, &str)],
    abbreviations: &RankAbbreviations,
    leaf_id: Option<&str>,
) -> usize {
    // nothing to name a trailing gap after
    let len = tokens
        .iter()
        .rposition(|(_, name)| !name.is_empty())
        .map_or(0, |last| last + 1);
    let tokens = &tokens[..len];
    if tokens.is_empty() {
        return 0;
    }

    let mut names = vec![String::new(); len];
    for i in (0..len).rev() {
        let (abbr, name) = tokens[i];
        names[i] = if name.is_empty() {
            placeholder_name(&names[i + 1], abbr)
        } else {
            name.to_string()
        };
    }

    store.ensure_root();
    for (i, &(abbr, _)) in tokens.iter().enumerate() {
        let rank = abbreviations.rank(abbr).unwrap_or(abbr);
        let id = match leaf_id {
            Some(leaf) if i + 1 == len => leaf,
            _ => names[i].as_str(),
        };
        let parent = if i == 0 { ROOT_ID } else { names[i - 1].as_str() };
        store.insert(id, parent, rank, &names[i], None);
    }
    len
}

/// Loads `sk__Bacteria;p__Proteobacteria;...` lines.
///
/// Lines that do not open with the most general rank tag, or that carry a
/// token without an `abbr__` prefix, are skipped with a warning.
pub fn load_lineages<R: BufRead>(store: &mut TaxonStore, reader: R, origin: &Path) -> Result<usize> {
    let abbreviations = store.abbreviations().clone();
    let leading = format!("{}__", abbreviations.leading_abbr().unwrap_or("sk"));
    let mut lines = 0;

    for record in data_lines(reader, origin) {
        let (line_no, line) = record?;
        if !line.starts_with(&leading) {
            log::warn!("A text line of lineage has to start with '{}'...skipped: {}", leading, line);
            continue;
        }
        let tokens: Option<Vec<(&str, &str)>> = line.split(';').map(split_token).collect();
        let Some(tokens) = tokens else {
            log::warn!("{}:{}: malformed lineage token...skipped: {}", origin.display(), line_no, line);
            continue;
        };
        insert_lineage(store, &tokens, &abbreviations, None);
        lines += 1;
    }
    Ok(lines)
}
