use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "application_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::application_subtype::Entity")]
    ApplicationSubtype,
}

impl Related<super::application_subtype::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApplicationSubtype.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
