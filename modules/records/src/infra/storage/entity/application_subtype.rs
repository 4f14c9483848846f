use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "application_subtype")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_name = "type")]
    pub type_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::application_type::Entity",
        from = "Column::TypeId",
        to = "super::application_type::Column::Id"
    )]
    ApplicationType,
}

impl Related<super::application_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApplicationType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
