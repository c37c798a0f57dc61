//! Input file fixtures

use patent_search::IngestInputs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One bibliographic row
#[derive(Debug, Clone)]
pub struct PatentRow {
    pub id: String,
    pub title: String,
    pub date: String,
    pub abstract_text: String,
}

impl PatentRow {
    pub fn new(id: &str, title: &str, date: &str, abstract_text: &str) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            date: date.into(),
            abstract_text: abstract_text.into(),
        }
    }
}

/// A temporary directory of input files
pub struct FixtureSet {
    dir: TempDir,
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl FixtureSet {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create fixture dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn patents(&self, rows: &[PatentRow]) -> PathBuf {
        let mut out =
            String::from("patent_id,patent_title,patent_date,num_claims,patent_type,patent_abstract\n");
        for row in rows {
            out.push_str(&format!(
                "{},{},{},3,utility,{}\n",
                row.id,
                csv_field(&row.title),
                row.date,
                csv_field(&row.abstract_text)
            ));
        }
        self.write("g_patent.csv", &out)
    }

    /// `(patent_id, sequence, text)` claims
    pub fn claims(&self, rows: &[(&str, i64, &str)]) -> PathBuf {
        let mut out =
            String::from("patent_id,claim_sequence,claim_text,dependent,claim_number,exemplary\n");
        for (id, seq, text) in rows {
            out.push_str(&format!("{},{},{},0,{},1\n", id, seq, csv_field(text), seq + 1));
        }
        self.write("g_claims.csv", &out)
    }

    /// `(patent_id, inventor name, inventor id)` people
    pub fn people(&self, rows: &[(&str, &str, &str)]) -> PathBuf {
        let mut out = String::from("patent_id,inventor_id,inventor_full_name,assignee_organization\n");
        for (id, name, inventor_id) in rows {
            out.push_str(&format!("{},{},{},Acme Corp\n", id, inventor_id, csv_field(name)));
        }
        self.write("g_people.csv", &out)
    }

    /// `(patent_id, section, class)` classifications
    pub fn classes(&self, rows: &[(&str, &str, &str)]) -> PathBuf {
        let mut out = String::from(
            "patent_id,cpc_section,cpc_class,cpc_subclass,cpc_group,cpc_type,cpc_group_title,cpc_class_title\n",
        );
        for (id, section, class) in rows {
            out.push_str(&format!(
                "{},{},{},{}X,{}X1/00,inventional,Group,Class\n",
                id, section, class, class, class
            ));
        }
        self.write("g_cpc.csv", &out)
    }

    /// `(patent_id, document number, date)` granted-patent citations
    pub fn us_citations(&self, rows: &[(&str, &str, &str)]) -> PathBuf {
        self.citations("g_us_citation.csv", "US_citation_", rows)
    }

    /// `(patent_id, document number, date)` application citations
    pub fn us_app_citations(&self, rows: &[(&str, &str, &str)]) -> PathBuf {
        self.citations("g_us_app_citation.csv", "US_app_citation_", rows)
    }

    fn citations(&self, name: &str, prefix: &str, rows: &[(&str, &str, &str)]) -> PathBuf {
        let columns = [
            "citation_sequence",
            "citation_document_number",
            "citation_date",
            "record_name",
            "wipo_kind",
            "citation_category",
        ];
        let mut out = String::from("patent_id");
        for column in columns {
            out.push_str(&format!(",{}{}", prefix, column));
        }
        out.push('\n');
        for (seq, (id, number, date)) in rows.iter().enumerate() {
            out.push_str(&format!("{},{},{},{},Smith,A,cited by examiner\n", id, seq, number, date));
        }
        self.write(name, &out)
    }

    /// `(patent_id, summary text)` summaries, tab separated
    pub fn summaries(&self, rows: &[(&str, &str)]) -> PathBuf {
        let mut out = String::from("patent_id\tsummary_text\n");
        for (id, text) in rows {
            out.push_str(&format!("{}\t{}\n", id, text));
        }
        self.write("g_brf_sum_text.tsv", &out)
    }

    /// A full input set for three patents
    pub fn standard(&self) -> IngestInputs {
        IngestInputs {
            patent: Some(self.patents(&[
                PatentRow::new("1001", "Hydrocarbon cracking catalyst", "2015-03-01", "A zeolite catalyst for cracking hydrocarbon feedstock"),
                PatentRow::new("1002", "Solar roof tile", "2018-06-12", "Photovoltaic roofing tiles"),
                PatentRow::new("1003", "Bicycle frame", "1999-11-30", "A lightweight frame, made of carbon fiber"),
            ])),
            claim: Some(self.claims(&[
                ("1001", 0, "A catalyst comprising zeolite"),
                ("1001", 1, "The catalyst of claim 1, wherein the zeolite is acidic"),
                ("1002", 0, "A roof tile comprising a photovoltaic cell"),
            ])),
            people: Some(self.people(&[
                ("1001", "Jane Doe", "inv-1"),
                ("1001", "John Roe", "inv-2"),
                ("1002", "Jane Doe", "inv-1"),
            ])),
            classes: Some(self.classes(&[
                ("1001", "B", "B01"),
                ("1001", "C", "C10"),
                ("1002", "H", "H02"),
            ])),
            us_citation: Some(self.us_citations(&[
                ("1001", "4000001", "1980-01-15"),
                ("1001", "4000001", "1980-01-15"),
                ("1003", "5000002", "not-a-date"),
            ])),
            us_app_citation: Some(self.us_app_citations(&[("1002", "20100012345", "2010-01-14")])),
            summary: Some(self.summaries(&[
                ("1002", "Tiles that generate power; also resist hydrocarbon stains."),
                ("1003", "!!!"),
            ])),
        }
    }
}
