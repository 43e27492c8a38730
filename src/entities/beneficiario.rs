// 🧺 Beneficiario Entity - food-bank program recipient
//
// One row per registered family. The id is the only identity; every other
// field is a plain value that Update replaces wholesale.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// SITUACAO (registration status)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Situacao {
    /// Receiving baskets
    #[default]
    Ativo,

    /// Left the program
    Inativo,

    /// Temporarily not receiving (pending documents, moved away, ...)
    Suspenso,
}

impl Situacao {
    pub fn as_str(&self) -> &'static str {
        match self {
            Situacao::Ativo => "Ativo",
            Situacao::Inativo => "Inativo",
            Situacao::Suspenso => "Suspenso",
        }
    }
}

impl fmt::Display for Situacao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Situacao {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ativo" => Ok(Situacao::Ativo),
            "Inativo" => Ok(Situacao::Inativo),
            "Suspenso" => Ok(Situacao::Suspenso),
            other => Err(UnknownVariant::new("situacao", other)),
        }
    }
}

// ============================================================================
// TIPO CESTA (basket type)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TipoCesta {
    /// Staple groceries
    #[default]
    #[serde(rename = "BASICA")]
    Basica,

    /// Fruit and vegetables
    #[serde(rename = "VERDE")]
    Verde,

    /// Dietary restrictions, infant formula
    #[serde(rename = "ESPECIAL")]
    Especial,
}

impl TipoCesta {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoCesta::Basica => "BASICA",
            TipoCesta::Verde => "VERDE",
            TipoCesta::Especial => "ESPECIAL",
        }
    }
}

impl fmt::Display for TipoCesta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TipoCesta {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BASICA" => Ok(TipoCesta::Basica),
            "VERDE" => Ok(TipoCesta::Verde),
            "ESPECIAL" => Ok(TipoCesta::Especial),
            other => Err(UnknownVariant::new("tipo_cesta", other)),
        }
    }
}

/// Stored text that does not name any enum variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// BENEFICIARIO ENTITY
// ============================================================================

/// A registered beneficiary.
///
/// `id == 0` means the record has not been persisted yet; the database
/// assigns one on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiario {
    #[serde(default)]
    pub id: i64,

    pub nome: String,

    /// CPF, 11 digits without punctuation
    pub cpf: String,

    pub data_nascimento: NaiveDate,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub telefone: String,

    // ========================================================================
    // ADDRESS
    // ========================================================================
    /// CEP, 8 digits without punctuation
    #[serde(default)]
    pub cep: String,

    #[serde(default)]
    pub logradouro: String,

    #[serde(default)]
    pub numero: String,

    #[serde(default)]
    pub complemento: String,

    #[serde(default)]
    pub bairro: String,

    #[serde(default)]
    pub cidade: String,

    /// Two-letter state code ("MG", "SP", ...)
    #[serde(default)]
    pub uf: String,

    // ========================================================================
    // PROGRAM
    // ========================================================================
    #[serde(default)]
    pub situacao: Situacao,

    #[serde(default)]
    pub tipo_cesta: TipoCesta,
}

impl Beneficiario {
    /// New, not yet persisted beneficiary with empty contact/address fields
    pub fn new(nome: impl Into<String>, cpf: impl Into<String>, data_nascimento: NaiveDate) -> Self {
        Beneficiario {
            id: 0,
            nome: nome.into(),
            cpf: cpf.into(),
            data_nascimento,
            email: String::new(),
            telefone: String::new(),
            cep: String::new(),
            logradouro: String::new(),
            numero: String::new(),
            complemento: String::new(),
            bairro: String::new(),
            cidade: String::new(),
            uf: String::new(),
            situacao: Situacao::default(),
            tipo_cesta: TipoCesta::default(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    pub fn is_active(&self) -> bool {
        self.situacao == Situacao::Ativo
    }

    /// "Rua X 157, 838 - Bairro, Cidade/UF"
    pub fn endereco(&self) -> String {
        let mut out = self.logradouro.clone();
        if !self.numero.is_empty() {
            out.push_str(", ");
            out.push_str(&self.numero);
        }
        if !self.complemento.is_empty() {
            out.push(' ');
            out.push_str(&self.complemento);
        }
        if !self.bairro.is_empty() {
            out.push_str(" - ");
            out.push_str(&self.bairro);
        }
        if !self.cidade.is_empty() {
            out.push_str(", ");
            out.push_str(&self.cidade);
            if !self.uf.is_empty() {
                out.push('/');
                out.push_str(&self.uf);
            }
        }
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================
