use chrono::NaiveDateTime;
use diesel::{prelude::*, sql_types::Bool, sqlite::Sqlite};
use serde::Serialize;

use crate::schema::hubs;

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct Hub {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub created_at: NaiveDateTime,
}

impl Hub {
    pub fn with_name<'a>(
        name: &'a str,
    ) -> Box<dyn BoxableExpression<hubs::table, Sqlite, SqlType = Bool> + 'a>
    {
        Box::new(hubs::name.eq(name))
    }

    pub fn validate_name(name: &str) -> bool {
        let trimmed = name.trim();
        !trimmed.is_empty() && trimmed.chars().count() <= 120
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSerializer {
    pub id: String,
    pub name: String,
    pub city: String,
    pub country: String,
}

impl HubSerializer {
    pub fn from_db_ty(hub: &Hub) -> HubSerializer {
        HubSerializer {
            id: hub.public_id.clone(),
            name: hub.name.clone(),
            city: hub.city.clone(),
            country: hub.country.clone(),
        }
    }
}
