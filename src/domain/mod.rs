// Domain data shapes shared across layers

pub mod dataset;
pub mod value;

pub use dataset::Dataset;
pub use value::{Value, ValueKind};

/// Column names of the gastos diretos schema that the pipeline gives meaning to.
/// Every other column is passed through untouched.
pub mod columns {
    pub const VALOR: &str = "valor";
    pub const ANO: &str = "ano";
    pub const MES: &str = "mes";
    pub const MES_ANO: &str = "mes_ano";
    pub const ANO_MES: &str = "ano_mes";
    pub const ORGAO: &str = "orgao";
    pub const FAVORECIDO: &str = "favorecido";
    pub const UF_FAVORECIDO: &str = "uf_favorecido";
    pub const UNIDADE_GESTORA: &str = "unidade_gestora";
    pub const TIPO_FAVORECIDO: &str = "tipo_favorecido";
    pub const PAGINA_ORIGEM: &str = "_pagina_origem";

    pub const NUMERIC: [&str; 3] = [VALOR, ANO, MES];

    pub const TEXT: [&str; 5] = [
        ORGAO,
        FAVORECIDO,
        UF_FAVORECIDO,
        UNIDADE_GESTORA,
        TIPO_FAVORECIDO,
    ];

    /// Columns whose null rate is monitored by the quality gate
    pub const CRITICAL: [&str; 5] = [VALOR, ANO, MES, ORGAO, FAVORECIDO];
}
