/// Every screen the app can show, with the parameters that screen needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    TeacherLogin,
    CreateSession,
    LiveSession,
    /// Summary of an archived session, by archive index.
    SessionSummary { session: usize },
    StudentEntry,
    StudentScan { roll: u32 },
    AdminLogin,
    AdminDashboard,
    AdminSessions { selected: Option<usize> },
    AdminTeachers,
    AdminSettings,
}

impl Route {
    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Rollcall",
            Route::TeacherLogin => "Teacher Login",
            Route::CreateSession => "Create Session",
            Route::LiveSession => "Live Session",
            Route::SessionSummary { .. } => "Session Summary",
            Route::StudentEntry => "Student Entry",
            Route::StudentScan { .. } => "Scan QR Code",
            Route::AdminLogin => "Admin Login",
            Route::AdminDashboard => "Admin Dashboard",
            Route::AdminTeachers => "Teachers",
            Route::AdminSettings => "System Settings",
            Route::AdminSessions { selected: None } => "Attendance Sessions",
            Route::AdminSessions { selected: Some(_) } => "Session Detail",
        }
    }

    /// Full-screen routes hide the top bar.
    pub fn shows_navbar(&self) -> bool {
        !matches!(
            self,
            Route::LiveSession | Route::StudentScan { .. } | Route::AdminSessions { .. }
        )
    }

    /// Routes that need a signed-in teacher.
    pub fn requires_teacher(&self) -> bool {
        matches!(
            self,
            Route::CreateSession | Route::LiveSession | Route::SessionSummary { .. }
        )
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Route::AdminDashboard
                | Route::AdminSessions { .. }
                | Route::AdminTeachers
                | Route::AdminSettings
        )
    }
}
