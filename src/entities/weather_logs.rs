use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "weather_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Natural key assigned by the ingestion worker.
    #[sea_orm(unique)]
    pub external_id: String,

    #[sea_orm(indexed)]
    pub fetched_at: DateTimeUtc,

    pub latitude: f64,

    pub longitude: f64,

    pub temperature: f64,

    pub humidity: Option<f64>,

    pub precipitation_probability: Option<f64>,

    pub source: String,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
