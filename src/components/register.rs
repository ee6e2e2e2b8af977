use crate::api::ApiError;
use crate::auth::{register, use_auth};
use crate::components::icons::AlertCircle;
use crate::web::router::use_router;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn RegisterPage() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();

    let (username, set_username) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (confirm_password, set_confirm_password) = signal(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if is_submitting.get_untracked() {
            return;
        }
        set_error_msg.set(None);

        // 客户端先行校验，两次密码不一致时不发任何网络请求
        if password.get_untracked() != confirm_password.get_untracked() {
            set_error_msg.set(Some("Passwords do not match".to_string()));
            return;
        }

        set_is_submitting.set(true);

        // 提交前取值；await 之后本组件可能已被路由卸载
        let username = username.get_untracked();
        let email = email.get_untracked();
        let password = password.get_untracked();
        let confirm = confirm_password.get_untracked();

        spawn_local(async move {
            let result = register(&auth, &username, &email, &password, &confirm).await;

            match result {
                // 注册不建立会话，导航到登录页
                Ok(()) => router.navigate("/login"),
                Err(ApiError::Status(_, message)) => {
                    let _ = set_error_msg.try_set(Some(message));
                }
                Err(_) => {
                    let _ = set_error_msg.try_set(Some("Registration failed".to_string()));
                }
            }
            let _ = set_is_submitting.try_set(false);
        });
    };

    let go_login = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.navigate("/login");
    };

    let field_class = "w-full bg-slate-900/50 border border-slate-600 rounded-lg px-4 py-3 text-white focus:outline-none focus:ring-2 focus:ring-teal-500/50 placeholder-slate-500";

    view! {
        <div class="min-h-screen w-full flex items-center justify-center p-4 bg-slate-900">
            <div class="bg-slate-800/60 backdrop-blur-xl p-8 rounded-2xl shadow-2xl w-full max-w-md border border-slate-700/50">
                <div class="text-center mb-8">
                    <h1 class="text-3xl font-extrabold text-transparent bg-clip-text bg-gradient-to-r from-teal-400 to-blue-400">
                        "Create Account"
                    </h1>
                    <p class="text-slate-400 mt-2 text-sm">"Join Market Pulse today"</p>
                </div>

                <Show when=move || error_msg.get().is_some()>
                    <div class="bg-red-500/10 border border-red-500/20 text-red-400 p-3 rounded-lg mb-6 text-sm flex items-center gap-2">
                        <AlertCircle attr:class="h-5 w-5 shrink-0" />
                        <span>{move || error_msg.get().unwrap_or_default()}</span>
                    </div>
                </Show>

                <form class="space-y-4" on:submit=on_submit>
                    <div>
                        <label class="block text-slate-400 text-xs font-bold uppercase tracking-wider mb-2" for="username">
                            "Username"
                        </label>
                        <input
                            id="username"
                            type="text"
                            placeholder="Choose a username"
                            on:input=move |ev| set_username.set(event_target_value(&ev))
                            prop:value=username
                            class=field_class
                            required
                        />
                    </div>
                    <div>
                        <label class="block text-slate-400 text-xs font-bold uppercase tracking-wider mb-2" for="email">
                            "Email"
                        </label>
                        <input
                            id="email"
                            type="email"
                            placeholder="Enter your email"
                            on:input=move |ev| set_email.set(event_target_value(&ev))
                            prop:value=email
                            class=field_class
                            required
                        />
                    </div>
                    <div class="grid grid-cols-2 gap-4">
                        <div>
                            <label class="block text-slate-400 text-xs font-bold uppercase tracking-wider mb-2" for="password">
                                "Password"
                            </label>
                            <input
                                id="password"
                                type="password"
                                placeholder="******"
                                on:input=move |ev| set_password.set(event_target_value(&ev))
                                prop:value=password
                                class=field_class
                                required
                            />
                        </div>
                        <div>
                            <label class="block text-slate-400 text-xs font-bold uppercase tracking-wider mb-2" for="confirm">
                                "Confirm"
                            </label>
                            <input
                                id="confirm"
                                type="password"
                                placeholder="******"
                                on:input=move |ev| set_confirm_password.set(event_target_value(&ev))
                                prop:value=confirm_password
                                class=field_class
                                required
                            />
                        </div>
                    </div>

                    <button
                        type="submit"
                        disabled=move || is_submitting.get()
                        class="w-full mt-2 bg-gradient-to-r from-teal-500 to-blue-500 hover:from-teal-400 hover:to-blue-400 text-white font-bold py-3 px-4 rounded-lg shadow-lg transition-all disabled:opacity-50"
                    >
                        {move || if is_submitting.get() { "Creating..." } else { "Create Account" }}
                    </button>
                </form>

                <div class="mt-8 pt-6 border-t border-slate-700/50 text-center text-slate-400 text-sm">
                    "Already have an account?"
                    <a href="/login" on:click=go_login class="text-teal-400 hover:text-teal-300 font-semibold ml-1">
                        "Sign In"
                    </a>
                </div>
            </div>
        </div>
    }
}
