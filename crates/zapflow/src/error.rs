// Zapflow
// Copyright (C) 2025 Zapflow contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::Error as SerdeError;
use std::io;
use thiserror::Error;
use tracing::error;
use zapflow_common::flow::GraphError;

#[derive(Debug, Error)]
pub enum ZapflowError {
    #[error("Unauthorized: `{0}`")]
    Unauthorized(String),
    #[error("Invalid request: `{0}`")]
    BadRequest(String),
    #[error("Not found: `{0}`")]
    NotFound(String),
    #[error("Flow graph error: `{0}`")]
    Graph(#[from] GraphError),
    #[error("Interpreter error: `{0}`")]
    Interpreter(String),
    #[error("Database error: `{0}`")]
    Db(#[from] DbErr),
    #[error("I/O error: `{0}`")]
    Io(#[from] io::Error),
    #[error("Figment error: `{0}`")]
    Figment(#[from] figment::Error),
    #[error("Serialization/deserialization error")]
    Serde(#[from] SerdeError),
}

impl ZapflowError {
    fn status(&self) -> StatusCode {
        match self {
            ZapflowError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ZapflowError::BadRequest(_) | ZapflowError::Graph(_) => StatusCode::BAD_REQUEST,
            ZapflowError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ZapflowError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ZapflowError>;
