//! OpenAPI 3 description of the JSON API.

use serde_json::{json, Value};

fn path_parameter(description: &str) -> Value {
    json!({
        "name": "path",
        "in": "query",
        "required": false,
        "description": description,
        "schema": {"type": "string"}
    })
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}
    })
}

fn ok_response(schema: &str) -> Value {
    json!({
        "description": "OK",
        "content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{schema}")}}}
    })
}

/// The API document, with `server_url` listed first in `servers`
pub fn document(server_url: &str) -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Log Viewer API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Browse and page through log files beneath a working directory."
        },
        "servers": [{"url": server_url}],
        "paths": {
            "/logs": {
                "get": {
                    "operationId": "listLogs",
                    "summary": "List the entries of a directory",
                    "parameters": [path_parameter("Directory to list; defaults to the working directory")],
                    "responses": {
                        "200": ok_response("LogListing"),
                        "400": error_response("Invalid path"),
                        "404": error_response("Directory does not exist")
                    }
                }
            },
            "/log": {
                "get": {
                    "operationId": "getLog",
                    "summary": "Metadata of a log file",
                    "parameters": [path_parameter("Log file, relative to the working directory")],
                    "responses": {
                        "200": ok_response("LogMetadata"),
                        "400": error_response("Empty or invalid path"),
                        "404": error_response("File does not exist")
                    }
                }
            },
            "/log/page": {
                "get": {
                    "operationId": "getLogPage",
                    "summary": "One page of 50 lines from a log file",
                    "parameters": [
                        path_parameter("Log file, relative to the working directory"),
                        {
                            "name": "page",
                            "in": "query",
                            "required": false,
                            "description": "Zero-based page index",
                            "schema": {"type": "integer", "minimum": 0, "default": 0}
                        }
                    ],
                    "responses": {
                        "200": ok_response("LogPage"),
                        "400": error_response("Empty or invalid path")
                    }
                }
            },
            "/log/raw": {
                "get": {
                    "operationId": "getLogRaw",
                    "summary": "Entire contents of a log file",
                    "parameters": [path_parameter("Log file, relative to the working directory")],
                    "responses": {
                        "200": ok_response("RawLog"),
                        "400": error_response("Invalid path"),
                        "404": error_response("No path given")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Error": {
                    "type": "object",
                    "required": ["message"],
                    "properties": {"message": {"type": "string"}}
                },
                "LogEntry": {
                    "type": "object",
                    "required": ["name", "path", "dir"],
                    "properties": {
                        "name": {"type": "string"},
                        "path": {"type": "string"},
                        "dir": {"type": "boolean"}
                    }
                },
                "LogListing": {
                    "type": "object",
                    "required": ["logfiles"],
                    "properties": {
                        "logfiles": {"type": "array", "items": {"$ref": "#/components/schemas/LogEntry"}}
                    }
                },
                "LogMetadata": {
                    "type": "object",
                    "required": ["name", "path", "fileSize"],
                    "properties": {
                        "name": {"type": "string"},
                        "path": {"type": "string"},
                        "fileSize": {"type": "integer", "format": "int64"}
                    }
                },
                "LogPage": {
                    "type": "object",
                    "required": ["page", "contents", "mediaType", "path"],
                    "properties": {
                        "previousPage": {"type": "integer"},
                        "page": {"type": "integer"},
                        "nextPage": {"type": "integer"},
                        "contents": {"type": "string", "format": "byte"},
                        "mediaType": {"type": "string"},
                        "path": {"type": "string"}
                    }
                },
                "RawLog": {
                    "type": "object",
                    "required": ["contents", "mediaType"],
                    "properties": {
                        "contents": {"type": "string", "format": "byte"},
                        "mediaType": {"type": "string"}
                    }
                }
            }
        }
    })
}
