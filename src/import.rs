// CSV import of beneficiaries
//
// Header row uses the JSON field names (nome, cpf, dataNascimento, ...).
// Ids in the file are ignored; the database assigns them.

use crate::context::Database;
use crate::entities::Beneficiario;
use crate::validation::{summarize, validate_beneficiario};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    /// (CSV line number, reason)
    pub rejected: Vec<(usize, String)>,
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<Beneficiario>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    load_csv_reader(file)
}

pub fn load_csv_reader<R: Read>(reader: R) -> Result<Vec<Beneficiario>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut beneficiarios = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        // header is line 1
        let mut beneficiario: Beneficiario = result
            .with_context(|| format!("Failed to deserialize beneficiario on line {}", index + 2))?;
        beneficiario.id = 0;
        beneficiarios.push(beneficiario);
    }

    Ok(beneficiarios)
}

/// Insert valid rows whose CPF is not registered yet, in one commit
pub fn import_beneficiarios(
    db: &Database,
    rows: Vec<Beneficiario>,
    today: NaiveDate,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        read: rows.len(),
        ..Default::default()
    };

    let mut ctx = db.context().with_actor("csv_importer");
    let mut seen_cpfs = HashSet::new();

    for (index, row) in rows.into_iter().enumerate() {
        let line = index + 2;

        if let Err(errors) = validate_beneficiario(&row, today) {
            warn!(line, "rejected row: {}", summarize(&errors));
            summary.rejected.push((line, summarize(&errors)));
            continue;
        }

        if !seen_cpfs.insert(row.cpf.clone()) || ctx.find_by_cpf(&row.cpf)?.is_some() {
            summary.skipped_duplicates += 1;
            continue;
        }

        ctx.add(row);
    }

    let saved = ctx.save_changes().context("Failed to save imported beneficiarios")?;
    summary.inserted = saved.inserted.len();

    info!(
        read = summary.read,
        inserted = summary.inserted,
        duplicates = summary.skipped_duplicates,
        rejected = summary.rejected.len(),
        "import finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TipoCesta;
    use crate::test_support::{pietra, seeded};
    use std::io::Write;

    const HEADER: &str = "nome,cpf,dataNascimento,email,telefone,cep,logradouro,numero,complemento,bairro,cidade,uf,situacao,tipoCesta";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn sample_csv() -> String {
        [
            HEADER,
            "Pietra Ester Ferreira,32989238697,1977-01-15,,33997690408,39880972,Rua Carneirinho Antonio Soares 157,838,,Água Quente,Águas Formosas,MG,Ativo,BASICA",
            "Camila Gabriela Luciana Baptista,39566573650,1996-04-03,camila_gabriela_baptista@br.gestant.com,31993792790,35410970,Praça Ramos 35-A,475,,Centro,Cachoeira do Campo,MG,Ativo,VERDE",
        ]
        .join("\n")
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_csv().as_bytes()).unwrap();

        let rows = load_csv(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], pietra(0));
        assert_eq!(rows[1].tipo_cesta, TipoCesta::Verde);
        assert!(rows.iter().all(|b| b.id == 0));
    }

    #[test]
    fn test_load_csv_reports_bad_line() {
        let csv = format!("{}\nBroken,123,not-a-date,,,,,,,,,MG,Ativo,BASICA", HEADER);

        let err = load_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(load_csv(Path::new("/definitely/not/here.csv")).is_err());
    }

    #[test]
    fn test_import_skips_existing_and_repeated_cpfs() {
        let db = seeded(vec![pietra(15)]);
        let mut rows = load_csv_reader(sample_csv().as_bytes()).unwrap();
        rows.push(rows[1].clone());

        let summary = import_beneficiarios(&db, rows, today()).unwrap();

        assert_eq!(summary.read, 3);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped_duplicates, 2);
        assert!(summary.rejected.is_empty());
        assert_eq!(db.context().find_by_cpf("39566573650").unwrap().map(|b| b.id), Some(16));
    }

    #[test]
    fn test_import_rejects_invalid_rows() {
        let db = Database::open_in_memory().unwrap();
        let mut bad = pietra(0);
        bad.uf = String::new();

        let summary = import_beneficiarios(&db, vec![bad, pietra(0)], today()).unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped_duplicates, 0);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].0, 2);
    }
}
