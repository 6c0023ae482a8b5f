use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;

use crate::models::{Candidate, FoodRow, ID_COLUMN, NAME_COLUMN, Nutrient, REMARKS_COLUMN};
use crate::normalize::{header_key, normalize_name, query_tokens};

pub const DEFAULT_ENCODING: &str = "shift_jis";

/// Result of a name search.
#[derive(Debug)]
pub enum SearchOutcome<'a> {
    /// The query had no usable tokens.
    EmptyQuery,
    NotFound,
    /// Exactly one row matched; treated as a direct selection.
    Single(&'a FoodRow),
    /// Several rows matched; names are unique, in dataset order.
    Candidates(Vec<Candidate>),
}

/// The food composition table, loaded once and read-only afterwards.
#[derive(Debug, Default)]
pub struct Dataset {
    rows: Vec<FoodRow>,
    by_id: HashMap<i64, usize>,
}

impl Dataset {
    /// Read and decode the table at `path`. Any failure here is fatal.
    pub fn load(path: &Path, encoding: &'static Encoding) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
        let text = decode(&bytes, encoding)
            .with_context(|| format!("Failed to decode dataset: {}", path.display()))?;
        let dataset = Self::from_reader(text.as_bytes())
            .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            encoding = encoding.name(),
            rows = dataset.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Parse an already-decoded (UTF-8) table.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
        let keys: Vec<String> = headers.iter().map(header_key).collect();
        let col = |name: &str| -> Option<usize> {
            let wanted = header_key(name);
            keys.iter().position(|k| *k == wanted)
        };

        let idx_id = col(ID_COLUMN);
        let idx_name = col(NAME_COLUMN).with_context(|| format!("Missing column: {NAME_COLUMN}"))?;
        let idx_remarks =
            col(REMARKS_COLUMN).with_context(|| format!("Missing column: {REMARKS_COLUMN}"))?;
        let mut idx_nutrients = Vec::with_capacity(Nutrient::ALL.len());
        for nutrient in Nutrient::ALL {
            let idx = col(nutrient.column())
                .with_context(|| format!("Missing column: {}", nutrient.column()))?;
            idx_nutrients.push((nutrient, idx));
        }

        let mut rows = Vec::new();
        let mut by_id = HashMap::new();

        for (position, result) in rdr.records().enumerate() {
            let line = position + 2;
            let record = result.with_context(|| format!("Failed to parse CSV row {line}"))?;

            let name = record.get(idx_name).unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }

            let id = match idx_id {
                Some(i) => {
                    let raw = record.get(i).unwrap_or("");
                    raw.parse::<i64>().with_context(|| {
                        format!("Invalid {ID_COLUMN} '{raw}' on CSV row {line}")
                    })?
                }
                None => i64::try_from(position + 1).context("row count overflow")?,
            };

            if by_id.insert(id, rows.len()).is_some() {
                bail!("Duplicate {ID_COLUMN} {id} on CSV row {line}");
            }

            let nutrients: BTreeMap<Nutrient, String> = idx_nutrients
                .iter()
                .map(|&(n, i)| (n, record.get(i).unwrap_or("").to_string()))
                .collect();

            rows.push(FoodRow {
                id,
                normalized_name: normalize_name(&name),
                name,
                nutrients,
                remarks: record.get(idx_remarks).unwrap_or("").to_string(),
            });
        }

        Ok(Self { rows, by_id })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[FoodRow] {
        &self.rows
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&FoodRow> {
        self.by_id.get(&id).map(|&i| &self.rows[i])
    }

    /// First row whose display name equals `name` exactly.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&FoodRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Rows whose normalized name contains every token of `query`.
    #[must_use]
    pub fn matching(&self, query: &str) -> Vec<&FoodRow> {
        let tokens = query_tokens(query);
        if tokens.is_empty() {
            return Vec::new();
        }
        self.rows
            .iter()
            .filter(|r| tokens.iter().all(|t| r.normalized_name.contains(t.as_str())))
            .collect()
    }

    #[must_use]
    pub fn search(&self, query: &str) -> SearchOutcome<'_> {
        if query_tokens(query).is_empty() {
            return SearchOutcome::EmptyQuery;
        }
        let matches = self.matching(query);
        match matches.len() {
            0 => SearchOutcome::NotFound,
            1 => SearchOutcome::Single(matches[0]),
            _ => {
                let mut seen = HashSet::new();
                let candidates = matches
                    .into_iter()
                    .filter(|r| seen.insert(r.name.as_str()))
                    .map(|r| Candidate {
                        id: r.id,
                        name: r.name.clone(),
                    })
                    .collect();
                SearchOutcome::Candidates(candidates)
            }
        }
    }
}

/// Resolve an encoding label such as `shift_jis`, `cp932` or `utf-8`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    let label = label.trim();
    // WHATWG has no "cp932" label; Shift_JIS there is the Windows-31J superset.
    let lookup = if label.eq_ignore_ascii_case("cp932") {
        "windows-31j"
    } else {
        label
    };
    Encoding::for_label(lookup.as_bytes())
        .with_context(|| format!("Unknown dataset encoding '{label}'"))
}

/// Strict decode: malformed input is an error rather than replacement chars.
fn decode(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let text = encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .with_context(|| format!("Dataset is not valid {}", encoding.name()))?;
    let text: &str = &text;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "食品番号,食品名(100g当たり),エネルギー,たんぱく質,脂質,炭水化物,食物繊維総量,食塩相当量,カ ル シ ウ ム,鉄,ビタミンA,ビタミンC,備　　考";

    fn sample_csv() -> String {
        format!(
            "{HEADER}
1,白米,356,6.1,0.9,77.6,0.5,0,5,0.8,0,0,うるち米
2,トマト,20,0.7,0.1,4.7,1,0,7,0.2,45,15,
3,トマトジュース 食塩添加,15,0.7,0.1,4,0.7,0.6,6,0.3,26,6,
4,ﾐﾆﾄﾏﾄ,30,1.1,0.1,7.2,1.4,0,12,0.4,80,32,
5,りんご,53,0.1,Tr,15.5,1.4,0,3,0.1,2,4,皮なし
"
        )
    }

    fn sample() -> Dataset {
        Dataset::from_reader(sample_csv().as_bytes()).unwrap()
    }

    #[test]
    fn test_from_reader_basic() {
        let ds = sample();
        assert_eq!(ds.len(), 5);
        let rice = ds.get(1).unwrap();
        assert_eq!(rice.name, "白米");
        assert_eq!(rice.raw(Nutrient::Energy), "356");
        assert_eq!(rice.amount(Nutrient::Protein), 6.1);
        assert_eq!(rice.remarks, "うるち米");
        assert_eq!(ds.get(4).unwrap().normalized_name, "みにとまと");
        assert!(ds.get(99).is_none());
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let csv = "食品番号,食品名(100g当たり),エネルギー\n1,白米,356\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Missing column"));
    }

    #[test]
    fn test_ids_default_to_row_position() {
        let csv = sample_csv().replace("食品番号,", "");
        let csv: String = csv
            .lines()
            .enumerate()
            .map(|(i, l)| {
                if i == 0 {
                    l.to_string()
                } else {
                    l.split_once(',').map(|(_, rest)| rest.to_string()).unwrap()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.get(1).unwrap().name, "白米");
        assert_eq!(ds.get(5).unwrap().name, "りんご");
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let csv = format!("{HEADER}\n1,a,1,1,1,1,1,1,1,1,1,1,\n1,b,1,1,1,1,1,1,1,1,1,1,\n");
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_invalid_id_is_fatal() {
        let csv = format!("{HEADER}\nabc,a,1,1,1,1,1,1,1,1,1,1,\n");
        assert!(Dataset::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_blank_name_rows_skipped() {
        let csv = format!("{HEADER}\n1,白米,356,6.1,0.9,77.6,0.5,0,5,0.8,0,0,\n2,,,,,,,,,,,,\n");
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let csv = format!("{HEADER}\n1,白米,356\n");
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        let rice = ds.get(1).unwrap();
        assert_eq!(rice.amount(Nutrient::Energy), 356.0);
        assert_eq!(rice.amount(Nutrient::VitaminC), 0.0);
        assert_eq!(rice.remarks, "");
    }

    #[test]
    fn test_search_single_match() {
        let ds = sample();
        match ds.search("白米") {
            SearchOutcome::Single(row) => assert_eq!(row.id, 1),
            other => panic!("expected single match, got {other:?}"),
        }
    }

    #[test]
    fn test_kana_query_finds_kanji_name() {
        let ds = sample();
        assert_eq!(ds.get(1).unwrap().normalized_name, "はくまい");
        match ds.search("はくまい") {
            SearchOutcome::Single(row) => assert_eq!(row.name, "白米"),
            other => panic!("expected single match, got {other:?}"),
        }
    }

    #[test]
    fn test_search_not_found() {
        let ds = sample();
        assert!(matches!(ds.search("ぶどう"), SearchOutcome::NotFound));
        assert!(ds.matching("ぶどう").is_empty());
    }

    #[test]
    fn test_search_empty_query() {
        let ds = sample();
        assert!(matches!(ds.search(""), SearchOutcome::EmptyQuery));
        assert!(matches!(ds.search("\u{3000} "), SearchOutcome::EmptyQuery));
    }

    #[test]
    fn test_search_candidates_across_scripts() {
        let ds = sample();
        // Hiragana query matches katakana and half-width names
        match ds.search("とまと") {
            SearchOutcome::Candidates(c) => {
                let ids: Vec<i64> = c.iter().map(|c| c.id).collect();
                assert_eq!(ids, vec![2, 3, 4]);
                assert_eq!(c.len(), ds.matching("とまと").len());
            }
            other => panic!("expected candidates, got {other:?}"),
        }
    }

    #[test]
    fn test_search_is_conjunctive_and_order_independent() {
        let ds = sample();
        for q in ["ジュース トマト", "とまと　じゅーす", "ﾄﾏﾄ ｼﾞｭｰｽ"] {
            match ds.search(q) {
                SearchOutcome::Single(row) => assert_eq!(row.id, 3, "query {q}"),
                other => panic!("expected single match for {q}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_candidate_names_are_unique() {
        let csv = format!(
            "{HEADER}\n1,とうふ,1,1,1,1,1,1,1,1,1,1,\n2,とうふ,2,2,2,2,2,2,2,2,2,2,\n3,とうふ 焼き,3,3,3,3,3,3,3,3,3,3,\n"
        );
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        match ds.search("とうふ") {
            SearchOutcome::Candidates(c) => {
                let names: Vec<&str> = c.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["とうふ", "とうふ 焼き"]);
            }
            other => panic!("expected candidates, got {other:?}"),
        }
    }

    #[test]
    fn test_find_by_name_exact() {
        let ds = sample();
        assert_eq!(ds.find_by_name("トマト").unwrap().id, 2);
        assert!(ds.find_by_name("とまと").is_none());
    }

    #[test]
    fn test_encoding_for_label() {
        assert_eq!(encoding_for_label("shift_jis").unwrap(), encoding_rs::SHIFT_JIS);
        assert_eq!(encoding_for_label("cp932").unwrap(), encoding_rs::SHIFT_JIS);
        assert_eq!(encoding_for_label("UTF-8").unwrap(), encoding_rs::UTF_8);
        assert!(encoding_for_label("klingon").is_err());
    }

    #[test]
    fn test_load_shift_jis_file() {
        let csv = sample_csv();
        let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(&csv);
        assert!(!had_errors);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let ds = Dataset::load(file.path(), encoding_rs::SHIFT_JIS).unwrap();
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.get(2).unwrap().name, "トマト");
    }

    #[test]
    fn test_load_utf8_with_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xEF\xBB\xBF").unwrap();
        file.write_all(sample_csv().as_bytes()).unwrap();

        let ds = Dataset::load(file.path(), encoding_rs::UTF_8).unwrap();
        assert_eq!(ds.len(), 5);
    }

    #[test]
    fn test_load_rejects_malformed_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_csv().as_bytes()).unwrap();
        file.write_all(&[0xFF, 0xFE, 0xFD]).unwrap();

        let err = Dataset::load(file.path(), encoding_rs::UTF_8).unwrap_err();
        assert!(format!("{err:#}").contains("not valid UTF-8"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Dataset::load(Path::new("/nonexistent/data.csv"), encoding_rs::SHIFT_JIS)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read dataset"));
    }
}
