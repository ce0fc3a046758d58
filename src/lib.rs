pub mod domain {
    pub mod entities {
        pub mod edit;
        pub mod item;
        pub mod purchase;
        pub mod record;
        pub mod supplier;
    }
    pub mod edit {
        pub mod editable_value;
        pub mod mode;
        pub mod navigator;
        pub mod session;
        pub mod tracker;
    }
}

pub mod usecase {
    pub mod ports {
        pub mod repo;
        pub mod validator;
    }
    pub mod services {
        pub mod edit_service;
        pub mod export_service;
        pub mod record_service;
        pub mod save_coordinator;
    }
}

pub mod infra {
    pub mod export {
        pub mod csv;
    }
    #[cfg(test)]
    pub mod memory;
    pub mod sqlite {
        pub mod queries;
        pub mod repo;
        pub mod schema;
        pub mod tables;
    }
    pub mod validation;
}

pub mod platform {
    pub mod desktop {
        pub mod blocking;
    }
    pub mod timer;
}

pub mod config {
    pub mod settings;
}

pub mod ui {
    pub mod state {
        pub mod app_state;
    }
}

pub mod app;

#[cfg(test)]
mod tests;
