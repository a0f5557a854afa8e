use crate::{
    config::DeploymentConfig,
    error::Result as RainfallResult,
    manager::{CommandOutput, RainfallCommand, RainfallManager},
};
use rmcp::{
    handler::server::tool::IntoCallToolResult, model::{CallToolResult, Content, ServerCapabilities, ServerInfo}, schemars, tool, transport::stdio, Error as McpError, ServerHandler, ServiceExt
};
use serde::Deserialize;
use tracing::{error, info};

/// Request naming a radar image on disk
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImagePathRequest {
    #[schemars(description = "Path to the radar image file")]
    pub path: String,
}

/// Tool outcome: the command output as JSON, or an error message
#[derive(Debug)]
pub struct CommandResponse(Result<CommandOutput, String>);

impl IntoCallToolResult for CommandResponse {
    fn into_call_tool_result(self) -> Result<CallToolResult, McpError> {
        match self.0 {
            Ok(output) => Ok(CallToolResult::success(vec![Content::text(
                serde_json::to_string_pretty(&output).unwrap_or_else(|_| format!("{:?}", output)),
            )])),
            Err(message) => Ok(CallToolResult::error(vec![Content::text(message)])),
        }
    }
}

/// MCP Server for radar rain-area extraction
#[derive(Clone)]
pub struct RainfallMcpServer {
    manager: RainfallManager,
}

impl RainfallMcpServer {
    pub fn new(manager: RainfallManager) -> Self {
        Self { manager }
    }

    pub fn from_config(config: &DeploymentConfig) -> RainfallResult<Self> {
        Ok(Self::new(RainfallManager::from_config(config)?))
    }

    /// Run a command on a blocking thread; pixel scans and file moves are synchronous
    async fn run(&self, command: RainfallCommand) -> CommandResponse {
        let name: &'static str = (&command).into();
        let manager = self.manager.clone();
        let joined = tokio::task::spawn_blocking(move || manager.execute(command)).await;
        let result = match joined {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(format!("{} failed: {}", name, e)),
            Err(e) => Err(format!("{} worker failed: {}", name, e)),
        };
        if let Err(message) = &result {
            error!(command = name, %message, "tool call failed");
        }
        CommandResponse(result)
    }
}

#[tool(tool_box)]
impl RainfallMcpServer {
    #[tool(description = "Extract rain areas from a radar image, archive the previous artifact and install the new one")]
    async fn process_image(&self, #[tool(aggr)] ImagePathRequest { path }: ImagePathRequest) -> CommandResponse {
        self.run(RainfallCommand::ProcessImage { path }).await
    }

    #[tool(description = "Extract rain areas from a radar image and return them as GeoJSON without installing")]
    async fn extract_only(&self, #[tool(aggr)] ImagePathRequest { path }: ImagePathRequest) -> CommandResponse {
        self.run(RainfallCommand::ExtractOnly { path }).await
    }

    #[tool(description = "Path of the artifact currently installed in the slot, if any")]
    async fn current_artifact(&self) -> CommandResponse {
        self.run(RainfallCommand::CurrentArtifact).await
    }

    #[tool(description = "Intensity bands used to classify pixels, in evaluation order")]
    async fn list_bands(&self) -> CommandResponse {
        self.run(RainfallCommand::ListBands).await
    }

    #[tool(description = "Get information about available commands and their parameters")]
    fn get_command_info(&self) -> String {
        command_info()
    }

    #[tool(description = "Get the JSON schema for RainfallCommand")]
    fn get_command_schema(&self) -> String {
        let schema = RainfallCommand::schema();
        serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|e| format!("Failed to serialize schema: {}", e))
    }
}

#[tool(tool_box)]
impl ServerHandler for RainfallMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Radar Rainfall Server - Turn radar overlay images into GeoJSON rain areas and keep the single current artifact up to date, archiving each superseded one.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn command_info() -> String {
    let mut info = String::new();
    info.push_str("Available RainfallCommands:\n\n");

    for (i, name) in RainfallCommand::command_names().iter().enumerate() {
        info.push_str(&format!("{}. {}\n", i + 1, name));
    }

    info.push_str("\nCommand Details:\n");
    let commands = vec![
        RainfallCommand::ProcessImage { path: "radar.png".to_string() },
        RainfallCommand::ExtractOnly { path: "radar.png".to_string() },
        RainfallCommand::CurrentArtifact,
        RainfallCommand::ListBands,
    ];

    for cmd in commands {
        info.push_str(&format!("\n- {}\n", cmd));
        info.push_str(&format!("  Description: {}\n", cmd.description()));

        let params = cmd.parameters_info();
        if !params.is_empty() {
            info.push_str("  Parameters:\n");
            for (name, desc, required) in params {
                let req_marker = if required { " (required)" } else { " (optional)" };
                info.push_str(&format!("    - {}{}: {}\n", name, req_marker, desc));
            }
        }
    }

    info
}

/// Serve `server` over stdin/stdout until the client disconnects
pub async fn serve_stdio(server: RainfallMcpServer) -> color_eyre::Result<()> {
    let service = match server.serve(stdio()).await {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to start MCP server: {:?}", e);
            return Err(e.into());
        }
    };
    info!("MCP server started, listening on stdio");

    service.waiting().await?;
    info!("MCP server stopped");
    Ok(())
}
