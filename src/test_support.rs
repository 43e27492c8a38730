// Shared fixtures for unit tests

use crate::context::Database;
use crate::entities::{Beneficiario, Situacao, TipoCesta};
use chrono::NaiveDate;

pub fn pietra(id: i64) -> Beneficiario {
    Beneficiario {
        id,
        nome: "Pietra Ester Ferreira".to_string(),
        cpf: "32989238697".to_string(),
        data_nascimento: NaiveDate::from_ymd_opt(1977, 1, 15).unwrap(),
        email: "".to_string(),
        telefone: "33997690408".to_string(),
        cep: "39880972".to_string(),
        logradouro: "Rua Carneirinho Antonio Soares 157".to_string(),
        numero: "838".to_string(),
        complemento: "".to_string(),
        bairro: "Água Quente".to_string(),
        cidade: "Águas Formosas".to_string(),
        uf: "MG".to_string(),
        situacao: Situacao::Ativo,
        tipo_cesta: TipoCesta::Basica,
    }
}

pub fn camila(id: i64) -> Beneficiario {
    Beneficiario {
        id,
        nome: "Camila Gabriela Luciana Baptista".to_string(),
        cpf: "39566573650".to_string(),
        data_nascimento: NaiveDate::from_ymd_opt(1996, 4, 3).unwrap(),
        email: "camila_gabriela_baptista@br.gestant.com".to_string(),
        telefone: "31993792790".to_string(),
        cep: "35410970".to_string(),
        logradouro: "Praça Ramos 35-A".to_string(),
        numero: "475".to_string(),
        complemento: "".to_string(),
        bairro: "Centro".to_string(),
        cidade: "Cachoeira do Campo".to_string(),
        uf: "MG".to_string(),
        situacao: Situacao::Ativo,
        tipo_cesta: TipoCesta::Verde,
    }
}

/// Fresh private database, seeded with `rows` through a committed context
pub fn seeded(rows: Vec<Beneficiario>) -> Database {
    let db = Database::open_in_memory().unwrap();
    let mut ctx = db.context();
    ctx.add_range(rows);
    ctx.save_changes().unwrap();
    db
}
