use model::network::{Agency, Network, VariantPolicy};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct NetworkRow {
    pub code: String,
    pub name: String,
    pub region: Option<String>,
    pub transport_type: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub variant_policy: Option<String>,
}

impl From<NetworkRow> for Network {
    fn from(row: NetworkRow) -> Self {
        Network {
            code: row.code,
            name: row.name,
            region: row.region,
            transport_type: row.transport_type,
            color: row.color,
            text_color: row.text_color,
            variant_policy: VariantPolicy::from_str_or_default(
                row.variant_policy.as_deref(),
            ),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AgencyRow {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub timezone: Option<String>,
}

impl From<AgencyRow> for Agency {
    fn from(row: AgencyRow) -> Self {
        Agency {
            id: row.id,
            name: row.name,
            url: row.url,
            timezone: row.timezone,
        }
    }
}
