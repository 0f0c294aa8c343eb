//! Editor workspace
//!
//! The user-facing model behind the file list and the textarea: which files
//! exist, which one is selected, and its content. The pipeline reads the
//! project from here when Run is pressed.

use crate::console_log;
use crate::pipeline::ProjectFiles;
use thiserror::Error;

/// Name of the file the workspace starts with
pub const DEFAULT_FILE: &str = "main.cpp";

/// Starting content of [`DEFAULT_FILE`]
pub const DEFAULT_CODE: &str = r#"#include <iostream>
#include <string>
#include <fstream>
int main() {
    std::ifstream myfile("test.txt");
    std::string name;

    myfile >> name;

    std::cout << "Hello " << name << std::endl;
    return 0;
}
"#;

/// Content given to every newly added file
pub const NEW_FILE_CONTENT: &str = "Hello, world!";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("file name cannot be empty")]
    EmptyName,
    #[error("{0} already exists")]
    FileExists(String),
    #[error("no such file: {0}")]
    NoSuchFile(String),
}

#[derive(Debug, Clone)]
pub struct Workspace {
    project: ProjectFiles,
    selected: String,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// A workspace holding the starter program, selected
    pub fn new() -> Self {
        let mut project = ProjectFiles::new();
        project.insert(DEFAULT_FILE, DEFAULT_CODE);
        Self {
            project,
            selected: DEFAULT_FILE.to_string(),
        }
    }

    pub fn files(&self) -> &ProjectFiles {
        &self.project
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn selected_content(&self) -> &str {
        self.project
            .get(&self.selected)
            .map(|f| f.content.as_str())
            .unwrap_or("")
    }

    /// Create a file with the default content and select it
    pub fn add_file(&mut self, name: &str) -> Result<(), WorkspaceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::EmptyName);
        }
        if self.project.contains(name) {
            return Err(WorkspaceError::FileExists(name.to_string()));
        }

        self.project.insert(name, NEW_FILE_CONTENT);
        self.selected = name.to_string();
        console_log!("[workspace] Added {}", name);
        Ok(())
    }

    pub fn select(&mut self, name: &str) -> Result<(), WorkspaceError> {
        if !self.project.contains(name) {
            return Err(WorkspaceError::NoSuchFile(name.to_string()));
        }
        self.selected = name.to_string();
        Ok(())
    }

    /// Replace the selected file's content (editor input)
    pub fn update_selected(&mut self, content: &str) {
        let name = self.selected.clone();
        self.project.insert(&name, content);
    }

    pub fn update_file(&mut self, name: &str, content: &str) -> Result<(), WorkspaceError> {
        if !self.project.contains(name) {
            return Err(WorkspaceError::NoSuchFile(name.to_string()));
        }
        self.project.insert(name, content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_main_selected() {
        let ws = Workspace::new();
        assert_eq!(ws.selected(), "main.cpp");
        assert_eq!(ws.selected_content(), DEFAULT_CODE);
        assert_eq!(ws.files().len(), 1);
    }

    #[test]
    fn test_add_file_selects_it() {
        let mut ws = Workspace::new();
        ws.add_file("test.txt").unwrap();
        assert_eq!(ws.selected(), "test.txt");
        assert_eq!(ws.selected_content(), "Hello, world!");
        let names: Vec<_> = ws.files().names().collect();
        assert_eq!(names, vec!["main.cpp", "test.txt"]);
    }

    #[test]
    fn test_add_file_rejects_empty_and_duplicates() {
        let mut ws = Workspace::new();
        assert_eq!(ws.add_file("  "), Err(WorkspaceError::EmptyName));
        assert_eq!(
            ws.add_file("main.cpp"),
            Err(WorkspaceError::FileExists("main.cpp".into()))
        );
        assert_eq!(ws.selected_content(), DEFAULT_CODE);
    }

    #[test]
    fn test_update_selected() {
        let mut ws = Workspace::new();
        ws.add_file("notes.txt").unwrap();
        ws.update_selected("Ada");
        ws.select("main.cpp").unwrap();
        ws.update_selected("int main() {}");

        assert_eq!(ws.files().get("notes.txt").unwrap().content, "Ada");
        assert_eq!(ws.selected_content(), "int main() {}");
    }

    #[test]
    fn test_select_unknown() {
        let mut ws = Workspace::new();
        assert_eq!(
            ws.select("missing.cpp"),
            Err(WorkspaceError::NoSuchFile("missing.cpp".into()))
        );
        assert_eq!(ws.selected(), "main.cpp");
        assert!(ws.update_file("missing.cpp", "x").is_err());
    }
}
