use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::normalize_token;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    Small,
    Medium,
    Large,
    Giant,
}

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Small => "small",
            Size::Medium => "medium",
            Size::Large => "large",
            Size::Giant => "giant",
        }
    }
}

/// Accepts the values the onboarding wizard sends as well as the canonical ones.
impl std::str::FromStr for Size {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "small" | "pequeno" | "chico" | "mini" | "toy" | "s" => Ok(Size::Small),
            "medium" | "mediano" | "m" => Ok(Size::Medium),
            "large" | "grande" | "l" => Ok(Size::Large),
            "giant" | "gigante" | "extra_grande" | "muy_grande" | "xl" => Ok(Size::Giant),
            _ => Err(ApiError::bad_request(format!("Unknown size: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl std::str::FromStr for Sex {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "male" | "macho" | "m" => Ok(Sex::Male),
            "female" | "hembra" | "f" | "h" => Ok(Sex::Female),
            _ => Err(ApiError::bad_request(format!("Unknown sex: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnimalStatus {
    Active,
    Lost,
    Deceased,
    Inactive,
}

impl AnimalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimalStatus::Active => "active",
            AnimalStatus::Lost => "lost",
            AnimalStatus::Deceased => "deceased",
            AnimalStatus::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for AnimalStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "active" | "activo" | "activa" => Ok(AnimalStatus::Active),
            "lost" | "perdido" | "perdida" => Ok(AnimalStatus::Lost),
            "deceased" | "fallecido" | "fallecida" => Ok(AnimalStatus::Deceased),
            "inactive" | "inactivo" | "inactiva" => Ok(AnimalStatus::Inactive),
            _ => Err(ApiError::bad_request(format!("Unknown status: {s}"))),
        }
    }
}

/// Read model. Enumerated columns are fetched as TEXT; `breed` is joined in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Animal {
    pub id: i64,
    pub breed_id: Option<i64>,
    pub breed: Option<String>,
    pub name: String,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub photo: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An owner as seen from one of their animals.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnimalOwner {
    pub owner_id: i64,
    pub name: String,
    pub email: String,
    pub is_primary: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateAnimalRequest {
    pub name: String,
    pub breed: Option<String>,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub photo: Option<String>,
    pub status: Option<String>,
    /// Owner to link as primary owner.
    #[serde(alias = "id_dueno")]
    pub owner_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAnimalRequest {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub photo: Option<String>,
    pub status: Option<String>,
}

impl UpdateAnimalRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.breed.is_none()
            && self.age.is_none()
            && self.sex.is_none()
            && self.birth_date.is_none()
            && self.color.is_none()
            && self.size.is_none()
            && self.photo.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkOwnerRequest {
    #[serde(alias = "id_dueno")]
    pub owner_id: i64,
    #[serde(default, alias = "es_principal")]
    pub is_primary: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnimalListQuery {
    pub id_dueno: Option<i64>,
}

/// Whole years elapsed between `birth` and `today`; `None` for future dates.
pub fn age_in_years(birth: NaiveDate, today: NaiveDate) -> Option<i32> {
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    Some(years)
}
