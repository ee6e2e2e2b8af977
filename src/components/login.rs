use crate::auth::{login, use_auth};
use crate::components::icons::AlertCircle;
use crate::web::router::use_router;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn LoginPage() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();

    let (username, set_username) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (remember_me, set_remember_me) = signal(false);
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        // 单次提交只允许一个在途登录请求
        if is_submitting.get_untracked() {
            return;
        }
        if username.get_untracked().is_empty() || password.get_untracked().is_empty() {
            set_error_msg.set(Some("Please fill in all fields".to_string()));
            return;
        }

        set_is_submitting.set(true);
        set_error_msg.set(None);

        // 提交前取值；await 之后本组件可能已被路由卸载
        let username = username.get_untracked();
        let password = password.get_untracked();
        let remember = remember_me.get_untracked();

        spawn_local(async move {
            let result = login(&auth, &username, &password, remember).await;

            // 成功后路由服务监听认证状态，自动进入仪表盘
            if result.is_err() {
                let _ = set_error_msg.try_set(Some("Invalid username or password".to_string()));
            }
            let _ = set_is_submitting.try_set(false);
        });
    };

    let go_register = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.navigate("/register");
    };

    view! {
        <div class="min-h-screen w-full flex items-center justify-center p-4 bg-slate-900">
            <div class="bg-slate-800/60 backdrop-blur-xl p-8 rounded-2xl shadow-2xl w-full max-w-md border border-slate-700/50">
                <div class="text-center mb-8">
                    <h1 class="text-3xl font-extrabold text-transparent bg-clip-text bg-gradient-to-r from-blue-400 to-teal-400">
                        "Welcome Back"
                    </h1>
                    <p class="text-slate-400 mt-2 text-sm">"Sign in to your dashboard"</p>
                </div>

                <Show when=move || error_msg.get().is_some()>
                    <div class="bg-red-500/10 border border-red-500/20 text-red-400 p-3 rounded-lg mb-6 text-sm flex items-center gap-2">
                        <AlertCircle attr:class="h-5 w-5 shrink-0" />
                        <span>{move || error_msg.get().unwrap_or_default()}</span>
                    </div>
                </Show>

                <form class="space-y-5" on:submit=on_submit>
                    <div>
                        <label class="block text-slate-400 text-xs font-bold uppercase tracking-wider mb-2" for="username">
                            "Username"
                        </label>
                        <input
                            id="username"
                            type="text"
                            placeholder="Enter your username"
                            on:input=move |ev| set_username.set(event_target_value(&ev))
                            prop:value=username
                            class="w-full bg-slate-900/50 border border-slate-600 rounded-lg px-4 py-3 text-white focus:outline-none focus:ring-2 focus:ring-blue-500/50 placeholder-slate-500"
                            required
                        />
                    </div>
                    <div>
                        <label class="block text-slate-400 text-xs font-bold uppercase tracking-wider mb-2" for="password">
                            "Password"
                        </label>
                        <input
                            id="password"
                            type="password"
                            placeholder="Enter your password"
                            on:input=move |ev| set_password.set(event_target_value(&ev))
                            prop:value=password
                            class="w-full bg-slate-900/50 border border-slate-600 rounded-lg px-4 py-3 text-white focus:outline-none focus:ring-2 focus:ring-blue-500/50 placeholder-slate-500"
                            required
                        />
                    </div>

                    <label class="flex items-center gap-3 cursor-pointer text-sm text-slate-300">
                        <input
                            type="checkbox"
                            class="w-4 h-4 accent-blue-600"
                            prop:checked=remember_me
                            on:change=move |ev| set_remember_me.set(event_target_checked(&ev))
                        />
                        "Remember me"
                    </label>

                    <button
                        type="submit"
                        disabled=move || is_submitting.get()
                        class="w-full bg-gradient-to-r from-blue-600 to-blue-500 hover:from-blue-500 hover:to-blue-400 text-white font-bold py-3 px-4 rounded-lg shadow-lg transition-all disabled:opacity-50"
                    >
                        {move || if is_submitting.get() { "Signing In..." } else { "Sign In" }}
                    </button>
                </form>

                <div class="mt-8 pt-6 border-t border-slate-700/50 text-center text-slate-400 text-sm">
                    "Don't have an account?"
                    <a href="/register" on:click=go_register class="text-blue-400 hover:text-blue-300 font-semibold ml-1">
                        "Create Account"
                    </a>
                </div>
            </div>
        </div>
    }
}
