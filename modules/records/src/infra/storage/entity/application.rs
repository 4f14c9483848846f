use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "application")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub created_at: DateTimeUtc,
    pub creator_id: Uuid,
    pub updated_at: DateTimeUtc,
    pub status: String,
    #[sea_orm(column_name = "type")]
    pub type_id: Uuid,
    #[sea_orm(column_name = "subtype")]
    pub subtype_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    /// JSON array of photo ids; NULL when the application has none.
    #[sea_orm(column_type = "Json", nullable)]
    pub photo_ids: Option<Json>,
    pub performer_id: Option<Uuid>,
    pub performer_time: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::application_type::Entity",
        from = "Column::TypeId",
        to = "super::application_type::Column::Id"
    )]
    ApplicationType,
    #[sea_orm(
        belongs_to = "super::application_subtype::Entity",
        from = "Column::SubtypeId",
        to = "super::application_subtype::Column::Id"
    )]
    ApplicationSubtype,
}

impl Related<super::application_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApplicationType.def()
    }
}

impl Related<super::application_subtype::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApplicationSubtype.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
