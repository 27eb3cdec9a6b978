use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpStatus {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl FromStr for HttpStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "200 OK" => Ok(HttpStatus::Ok),
            "400 BAD REQUEST" => Ok(HttpStatus::BadRequest),
            "404 NOT FOUND" => Ok(HttpStatus::NotFound),
            "500 INTERNAL SERVER ERROR" => Ok(HttpStatus::InternalServerError),
            _ => Err(()),
        }
    }
}

impl ToString for HttpStatus {
    fn to_string(&self) -> String {
        match self {
            Self::Ok => "200 OK".to_string(),
            Self::BadRequest => "400 BAD REQUEST".to_string(),
            Self::NotFound => "404 NOT FOUND".to_string(),
            Self::InternalServerError => "500 INTERNAL SERVER ERROR".to_string(),
        }
    }
}
