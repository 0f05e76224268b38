use chrono::{DateTime as ChronoDateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 设备实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub device_id: String,
    pub device_type: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub config: Option<Json>,
    pub last_seen: ChronoDateTime<Utc>,
    pub created_at: ChronoDateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::measurement::Entity")]
    Measurement,
    #[sea_orm(has_many = "super::error_report::Entity")]
    ErrorReport,
    #[sea_orm(has_many = "super::warning::Entity")]
    Warning,
}

impl Related<super::measurement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Measurement.def()
    }
}

impl Related<super::error_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ErrorReport.def()
    }
}

impl Related<super::warning::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warning.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub mod device {
    pub use super::*;
}

/// 测量记录实体
pub mod measurement {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "measurements")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub device_id: String,
        pub timestamp: i64,
        pub status: String,
        pub data_valid: bool,
        pub data: Json,
        pub created_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::device::Entity",
            from = "Column::DeviceId",
            to = "super::device::Column::DeviceId"
        )]
        Device,
    }

    impl Related<super::device::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Device.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 错误上报实体
pub mod error_report {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "errors")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub device_id: String,
        pub timestamp: i64,
        pub severity: String,
        pub category: String,
        pub message: String,
        pub error_stats: Option<Json>,
        pub sensor_data: Option<Json>,
        pub created_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::device::Entity",
            from = "Column::DeviceId",
            to = "super::device::Column::DeviceId"
        )]
        Device,
    }

    impl Related<super::device::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Device.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 告警实体
pub mod warning {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "warnings")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub device_id: String,
        pub timestamp: i64,
        pub message: String,
        pub resolved: bool,
        pub created_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::device::Entity",
            from = "Column::DeviceId",
            to = "super::device::Column::DeviceId"
        )]
        Device,
    }

    impl Related<super::device::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Device.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
