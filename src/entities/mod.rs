// Entity Models
//
// A single entity in this service: the beneficiary registry row.

pub mod beneficiario;

pub use beneficiario::{Beneficiario, Situacao, TipoCesta, UnknownVariant};
